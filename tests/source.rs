use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use assert_matches::assert_matches;

use sw_vehicle_installer::error::InstallError;
use sw_vehicle_installer::source::{HttpXmlSource, XmlSource};

fn read_request(stream: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buffer.windows(4).any(|w| w == b"\r\n\r\n") {
        let read = stream.read(&mut chunk).unwrap();
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Serves one canned response and hands back the raw request it saw.
fn serve_once(status_line: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/raw/vehicle.xml", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        let response = format!(
            "{status_line}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
        request
    });
    (url, handle)
}

#[test]
fn returns_body_on_success() {
    let body = "<?xml version='1.0'?><vehicle/>";
    let (url, server) = serve_once("HTTP/1.1 200 OK", body);
    let source = HttpXmlSource::new().unwrap();

    let text = source.fetch_text(&url).unwrap();

    assert_eq!(text, body);
    let request = server.join().unwrap();
    assert!(request.starts_with("GET /raw/vehicle.xml"));
    assert!(request.to_lowercase().contains("user-agent: sw-install/"));
}

#[test]
fn error_status_is_reported() {
    let (url, server) = serve_once("HTTP/1.1 404 Not Found", "404: Not Found");
    let source = HttpXmlSource::new().unwrap();

    assert_matches!(
        source.fetch_text(&url),
        Err(InstallError::FetchStatus { status: 404, .. })
    );
    server.join().unwrap();
}

#[test]
fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/slow.xml", listener.local_addr().unwrap());
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        thread::sleep(Duration::from_secs(2));
        drop(stream);
    });
    let source = HttpXmlSource::with_timeout(Duration::from_millis(300)).unwrap();

    assert_matches!(source.fetch_text(&url), Err(InstallError::FetchTimeout));
    server.join().unwrap();
}

#[test]
fn connection_refused_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/gone.xml", listener.local_addr().unwrap());
    drop(listener);
    let source = HttpXmlSource::with_timeout(Duration::from_secs(5)).unwrap();

    assert_matches!(source.fetch_text(&url), Err(InstallError::FetchTransport(_)));
}
