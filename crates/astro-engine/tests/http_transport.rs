use std::io::{Cursor, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use astro_contracts::catalog::{CatalogSource, BUILTIN_MODELS};
use astro_contracts::diagnostics::MemorySink;
use astro_contracts::request::{EnhancementInputs, EnhancementRequest};
use astro_contracts::session::Session;
use astro_engine::codec::{data_url, encode_image_bytes};
use astro_engine::images::write_download;
use astro_engine::{CatalogClient, EnhanceClient, EnhanceError, HttpTransport, ServiceConfig};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::json;

struct StubServer {
    base_url: String,
    handle: JoinHandle<String>,
}

impl StubServer {
    /// Answers exactly one request and hands back what it received.
    fn respond_once(status_line: &'static str, body: String) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let handle = thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return String::new();
            };
            let request = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
            request
        });
        Ok(Self { base_url, handle })
    }

    fn received(self) -> String {
        self.handle.join().unwrap_or_default()
    }
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let read = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(read) => read,
        };
        buf.extend_from_slice(&chunk[..read]);
        let Some(header_end) = find(&buf, b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok());
        let complete = match content_length {
            Some(length) => buf.len() >= header_end + 4 + length,
            None if headers.contains("transfer-encoding: chunked") => buf.ends_with(b"0\r\n\r\n"),
            None => true,
        };
        if complete {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 2 % 256) as u8, (y * 2 % 256) as u8, 128, 255])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn galaxy_request(image: Vec<u8>) -> EnhancementRequest {
    EnhancementRequest::new(EnhancementInputs {
        image,
        filename: "m31.png".to_string(),
        model_name: "ESRGAN Plus (4x)".to_string(),
        preset: "Galaxy".to_string(),
        custom_prompt: None,
        noise_level: 20.0,
        scientific_mode: false,
    })
    .unwrap()
}

#[test]
fn models_endpoint_returns_remote_list() -> anyhow::Result<()> {
    let stub = StubServer::respond_once("200 OK", json!(["Remote A", "Remote B"]).to_string())?;
    let transport = HttpTransport::new(ServiceConfig::new(&stub.base_url))?;
    let sink = MemorySink::new();

    let models = CatalogClient::new(&transport).fetch_models(&sink);

    assert_eq!(models, vec!["Remote A", "Remote B"]);
    assert!(sink.is_empty());
    assert!(stub.received().starts_with("GET /models HTTP/1.1"));
    Ok(())
}

#[test]
fn models_endpoint_error_status_is_reported() -> anyhow::Result<()> {
    let stub = StubServer::respond_once("500 Internal Server Error", "internal error".to_string())?;
    let transport = HttpTransport::new(ServiceConfig::new(&stub.base_url))?;
    let sink = MemorySink::new();

    let models = CatalogClient::new(&transport).fetch_models(&sink);

    assert!(models.is_empty());
    assert_eq!(sink.entries()[0].message, "Error fetching models: internal error");
    Ok(())
}

#[test]
fn models_timeout_falls_back_to_builtin_catalog() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let base_url = format!("http://{}", listener.local_addr()?);
    thread::spawn(move || {
        let held: Vec<TcpStream> = listener
            .incoming()
            .take(2)
            .filter_map(Result::ok)
            .collect();
        thread::sleep(Duration::from_secs(2));
        drop(held);
    });
    let config = ServiceConfig::new(&base_url).with_timeout(Some(Duration::from_millis(200)));
    let transport = HttpTransport::new(config)?;
    let sink = MemorySink::new();

    let catalog = CatalogClient::new(&transport).load_catalog(&sink);

    assert_eq!(catalog.models(), BUILTIN_MODELS);
    assert_eq!(catalog.models_source(), CatalogSource::Builtin);
    let entries = sink.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].message.starts_with("Error connecting to API:"));
    Ok(())
}

#[test]
fn refused_connection_is_a_transport_error() -> anyhow::Result<()> {
    let base_url = {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        format!("http://{}", listener.local_addr()?)
    };
    let transport = HttpTransport::new(ServiceConfig::new(&base_url))?;
    let sink = MemorySink::new();
    let mut session = Session::new();

    let err = EnhanceClient::new(&transport)
        .submit(&mut session, &galaxy_request(png(8, 8)), &sink)
        .unwrap_err();

    assert!(matches!(err, EnhanceError::Transport(_)));
    assert!(session.current().is_none());
    assert!(sink.entries()[0].message.starts_with("Error connecting to API:"));
    Ok(())
}

#[test]
fn enhance_posts_multipart_and_surfaces_service_error() -> anyhow::Result<()> {
    let stub = StubServer::respond_once("500 Internal Server Error", "internal error".to_string())?;
    let transport = HttpTransport::new(ServiceConfig::new(&stub.base_url))?;
    let sink = MemorySink::new();
    let mut session = Session::new();

    let err = EnhanceClient::new(&transport)
        .submit(&mut session, &galaxy_request(png(100, 100)), &sink)
        .unwrap_err();

    match err {
        EnhanceError::Service { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("internal error"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(session.current().is_none());
    assert!(!session.is_in_flight());

    let received = stub.received();
    assert!(received.starts_with("POST /enhance_image HTTP/1.1"));
    assert!(received.contains("name=\"model_name\"\r\n\r\nESRGAN Plus (4x)\r\n"));
    assert!(received.contains("name=\"preset\"\r\n\r\nGalaxy\r\n"));
    assert!(received.contains("name=\"noise_level\"\r\n\r\n20.0\r\n"));
    assert!(received.contains("name=\"scientific_mode\"\r\n\r\nfalse\r\n"));
    assert!(received.contains("name=\"image\"; filename=\"m31.png\""));
    assert!(received.contains("Content-Type: image/png"));
    assert!(!received.contains("custom_prompt"));
    Ok(())
}

#[test]
fn galaxy_scenario_round_trips_to_download() -> anyhow::Result<()> {
    let original = png(100, 100);
    let enhanced = png(400, 400);
    let body = json!({
        "enhanced_image": data_url("image/png", &enhanced),
        "prompt_used": "Galaxy: enhance spiral structure",
        "before_after": [encode_image_bytes(&original), data_url("image/png", &enhanced)],
    })
    .to_string();
    let stub = StubServer::respond_once("200 OK", body)?;
    let transport = HttpTransport::new(ServiceConfig::new(&stub.base_url))?;
    let sink = MemorySink::new();
    let mut session = Session::new();

    EnhanceClient::new(&transport).submit(&mut session, &galaxy_request(original.clone()), &sink)?;

    let snapshot = session.current().expect("session holds the result");
    assert_eq!(snapshot.result.enhanced_image.width, 400);
    assert_eq!(snapshot.result.before_after.as_pair().len(), 2);
    assert_eq!(snapshot.result.before_after.original.bytes, original);

    let temp = tempfile::tempdir()?;
    let path = write_download(temp.path(), snapshot)?;
    assert_eq!(std::fs::read(path)?, enhanced);
    assert!(sink.is_empty());
    Ok(())
}
