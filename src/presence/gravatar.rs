use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, warn};

use super::PresenceCheck;
use crate::Address;

const AVATAR_ENDPOINT: &str = "https://www.gravatar.com/avatar";

/// Checks whether Gravatar serves an image for the address. `d=404` makes
/// the service answer 404 instead of a generated default picture.
#[derive(Debug, Clone)]
pub struct GravatarPresence {
    client: Client,
    endpoint: String,
}

impl GravatarPresence {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, AVATAR_ENDPOINT))
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn avatar_url(&self, address: &Address) -> String {
        format!(
            "{}/{}?d=404",
            self.endpoint.trim_end_matches('/'),
            avatar_hash(address)
        )
    }
}

fn avatar_hash(address: &Address) -> String {
    let key = address.as_str().trim().to_lowercase();
    format!("{:x}", md5::compute(key.as_bytes()))
}

impl PresenceCheck for GravatarPresence {
    fn has_presence(&self, address: &Address) -> bool {
        let url = self.avatar_url(address);
        match self.client.head(&url).send() {
            Ok(response) => {
                debug!(%url, status = %response.status(), "presence lookup");
                response.status().is_success()
            }
            Err(err) => {
                warn!(%url, error = %err, "presence lookup failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;
    use crate::parse_address;

    fn spawn_http(status_line: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let base = format!("http://{}/avatar", listener.local_addr().expect("addr"));
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).expect("header") == 0 || header == "\r\n" {
                    break;
                }
            }
            let response = format!("{status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            stream.write_all(response.as_bytes()).expect("write");
            request_line
        });
        (base, handle)
    }

    #[test]
    fn hash_uses_trimmed_lowercase_address() {
        let address = parse_address("MyEmailAddress@example.com ").unwrap();
        assert_eq!(avatar_hash(&address), "0bc83cb571cd1c50ba6f3e8a78ef1346");
    }

    #[test]
    fn found_avatar_is_presence() {
        let (base, handle) = spawn_http("HTTP/1.1 200 OK");
        let presence = GravatarPresence::with_client(Client::new(), base);
        let address = parse_address("someone@example.com").unwrap();
        assert!(presence.has_presence(&address));
        let request_line = handle.join().expect("server");
        assert!(request_line.starts_with("HEAD /avatar/"), "{request_line}");
        assert!(request_line.contains("?d=404"));
    }

    #[test]
    fn missing_avatar_is_no_presence() {
        let (base, handle) = spawn_http("HTTP/1.1 404 Not Found");
        let presence = GravatarPresence::with_client(Client::new(), base);
        let address = parse_address("nobody@example.com").unwrap();
        assert!(!presence.has_presence(&address));
        handle.join().expect("server");
    }
}
