use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use nel_tag::{StanfordConfig, StanfordTagger, TagError, Tagger};
use nel_types::Doc;

type Requests = Arc<Mutex<Vec<String>>>;

/// Accept `connections` connections, answering one request line on each.
fn serve<F>(connections: usize, reply: F) -> (u16, Requests, JoinHandle<()>)
where
    F: Fn(&str) -> Vec<u8> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let requests = Requests::default();
    let log = Arc::clone(&requests);
    let handle = thread::spawn(move || {
        for _ in 0..connections {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end_matches('\n').to_string();
            let _ = stream.write_all(&reply(&line));
            log.lock().unwrap().push(line);
        }
    });
    (port, requests, handle)
}

fn ner(word: &str) -> &'static str {
    match word {
        "Barack" | "Obama" => "PERSON",
        "Paris" => "LOCATION",
        _ => "O",
    }
}

fn ner_reply(line: &str) -> Vec<u8> {
    let mut out = String::new();
    for word in line.split(' ') {
        out.push_str(&format!("{word}/{} ", ner(word)));
    }
    out.push('\n');
    out.into_bytes()
}

fn tagger(port: u16, chunk_bytes: usize) -> StanfordTagger {
    StanfordTagger::new(StanfordConfig {
        host: "127.0.0.1".to_string(),
        port,
        chunk_bytes,
    })
}

#[test]
fn tags_each_chunk_over_a_fresh_connection() {
    let (port, requests, server) = serve(2, ner_reply);
    let mut tagger = tagger(port, 30);
    let mut doc = Doc::new("d1", "Barack Obama visited Paris. He left.");

    let mentions = tagger.produce_mentions(&mut doc).unwrap();
    server.join().unwrap();

    assert_eq!(
        *requests.lock().unwrap(),
        vec!["Barack Obama visited Paris .", "He left ."]
    );
    assert_eq!(doc.tokens.len(), 8);
    let found: Vec<(usize, &str, Option<&str>)> = mentions
        .iter()
        .map(|m| (m.begin, m.text.as_str(), m.tag.as_deref()))
        .collect();
    assert_eq!(
        found,
        vec![(0, "Barack Obama", Some("person")), (21, "Paris", Some("location"))]
    );
}

#[test]
fn tag_builds_chains() {
    let (port, _, server) = serve(1, ner_reply);
    let mut tagger = tagger(port, 1024);
    let mut doc = Doc::new("d2", "Barack Obama met Obama in Paris.");
    tagger.tag(&mut doc).unwrap();
    server.join().unwrap();

    assert_eq!(doc.chains.len(), 2);
    let sizes: Vec<usize> = doc.chains.iter().map(|c| c.mentions.len()).collect();
    assert_eq!(sizes, vec![1, 2]);
}

#[test]
fn missing_tags_are_a_token_mismatch() {
    let (port, _, server) = serve(1, |line: &str| {
        // Answer for every word but the last.
        let kept = line.rsplit_once(' ').map_or("", |(head, _)| head);
        ner_reply(kept)
    });
    let mut tagger = tagger(port, 1024);
    let mut doc = Doc::new("d3", "Barack Obama visited Paris.");
    let err = tagger.produce_mentions(&mut doc).unwrap_err();
    server.join().unwrap();
    assert!(matches!(err, TagError::TokenMismatch { tags: 4, tokens: 5 }));
}

#[test]
fn unterminated_reply_overflows() {
    let (port, _, server) = serve(1, |line: &str| vec![b'x'; line.len() * 20 + 64]);
    let mut tagger = tagger(port, 1024);
    let mut doc = Doc::new("d4", "Obama.");
    let err = tagger.produce_mentions(&mut doc).unwrap_err();
    server.join().unwrap();
    assert!(matches!(err, TagError::ResponseOverflow { limit: 80 }));
}

#[test]
fn closed_connection_is_a_protocol_error() {
    let (port, _, server) = serve(1, |_: &str| Vec::new());
    let mut tagger = tagger(port, 1024);
    let mut doc = Doc::new("d5", "Obama.");
    let err = tagger.produce_mentions(&mut doc).unwrap_err();
    server.join().unwrap();
    assert!(matches!(err, TagError::Protocol(_)));
}
