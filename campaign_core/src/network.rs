use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{info, warn};

use mission_proto::{decode_client_message, encode_server_message, ClientMessage, ServerMessage};
use mission_schema::SessionId;

/// Lifecycle and command events pulled off client sockets, tagged with the
/// session id assigned at accept time.
#[derive(Debug)]
pub enum ClientEvent {
    Connected(SessionId),
    Message(SessionId, ClientMessage),
    Disconnected(SessionId),
}

struct ClientHandle {
    session_id: SessionId,
    stream: TcpStream,
}

/// Write half of the mission server: a registry of connected consoles that
/// frames and fans out server messages. Events arrive on the channel returned
/// by [`start_mission_server`].
pub struct MissionServer {
    clients: Arc<Mutex<Vec<ClientHandle>>>,
    local_addr: SocketAddr,
}

impl MissionServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn client_count(&self) -> usize {
        self.clients
            .lock()
            .expect("client registry mutex poisoned")
            .len()
    }

    pub fn broadcast(&self, message: &ServerMessage) {
        let frame = match encode_server_message(message) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(target: "tauntaun::server", error = %err, "broadcast.encode_failed");
                return;
            }
        };
        let mut guard = self.clients.lock().expect("client registry mutex poisoned");
        guard.retain_mut(|client| match write_frame(&mut client.stream, &frame) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    target: "tauntaun::server",
                    session_id = client.session_id,
                    error = %err,
                    "client.dropped"
                );
                false
            }
        });
    }

    pub fn send_to(&self, session_id: SessionId, message: &ServerMessage) {
        let frame = match encode_server_message(message) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(target: "tauntaun::server", error = %err, "send.encode_failed");
                return;
            }
        };
        let mut guard = self.clients.lock().expect("client registry mutex poisoned");
        let Some(client) = guard
            .iter_mut()
            .find(|client| client.session_id == session_id)
        else {
            warn!(target: "tauntaun::server", session_id, "send.unknown_session");
            return;
        };
        if let Err(err) = write_frame(&mut client.stream, &frame) {
            warn!(
                target: "tauntaun::server",
                session_id,
                error = %err,
                "client.write_failed"
            );
        }
    }
}

/// Bind the listener and spawn the accept loop plus one reader thread per
/// console. Session ids are assigned at accept time and never reused.
pub fn start_mission_server(bind_addr: &str) -> io::Result<(MissionServer, Receiver<ClientEvent>)> {
    let listener = TcpListener::bind(bind_addr)?;
    let local_addr = listener.local_addr()?;

    let (sender, receiver) = unbounded::<ClientEvent>();
    let clients: Arc<Mutex<Vec<ClientHandle>>> = Arc::new(Mutex::new(Vec::new()));
    let accept_clients = Arc::clone(&clients);

    thread::spawn(move || {
        let mut next_session: SessionId = 1;
        loop {
            match listener.accept() {
                Ok((stream, addr)) => {
                    let session_id = next_session;
                    next_session += 1;
                    info!(
                        target: "tauntaun::server",
                        session_id,
                        peer = %addr,
                        "client.connected"
                    );
                    if let Err(err) = stream.set_nodelay(true) {
                        warn!(
                            target: "tauntaun::server",
                            session_id,
                            error = %err,
                            "client.nodelay_failed"
                        );
                    }
                    let reader = match stream.try_clone() {
                        Ok(reader) => reader,
                        Err(err) => {
                            warn!(
                                target: "tauntaun::server",
                                session_id,
                                error = %err,
                                "client.clone_failed"
                            );
                            continue;
                        }
                    };
                    accept_clients
                        .lock()
                        .expect("client registry mutex poisoned")
                        .push(ClientHandle { stream, session_id });
                    if sender.send(ClientEvent::Connected(session_id)).is_err() {
                        break;
                    }
                    let events = sender.clone();
                    let reader_clients = Arc::clone(&accept_clients);
                    thread::spawn(move || {
                        read_client_frames(session_id, reader, &events);
                        reader_clients
                            .lock()
                            .expect("client registry mutex poisoned")
                            .retain(|client| client.session_id != session_id);
                        let _ = events.send(ClientEvent::Disconnected(session_id));
                    });
                }
                Err(err) => {
                    warn!(target: "tauntaun::server", error = %err, "client.accept_failed");
                    thread::sleep(Duration::from_millis(200));
                }
            }
        }
    });

    Ok((
        MissionServer {
            clients,
            local_addr,
        },
        receiver,
    ))
}

fn read_client_frames(session_id: SessionId, mut stream: TcpStream, events: &Sender<ClientEvent>) {
    loop {
        let frame = match read_frame(&mut stream) {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(err) => {
                warn!(
                    target: "tauntaun::server",
                    session_id,
                    error = %err,
                    "client.read_failed"
                );
                break;
            }
        };
        match decode_client_message(&frame) {
            Ok(message) => {
                if events.send(ClientEvent::Message(session_id, message)).is_err() {
                    break;
                }
            }
            Err(err) => {
                warn!(
                    target: "tauntaun::server",
                    session_id,
                    error = %err,
                    "client.frame_rejected"
                );
            }
        }
    }
}

/// Read one length-prefixed frame; `Ok(None)` means the peer closed cleanly.
fn read_frame(stream: &mut TcpStream) -> io::Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    match stream.read_exact(&mut len_bytes) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err),
    }
    let len = u32::from_le_bytes(len_bytes) as usize;
    let mut frame = vec![0u8; len];
    stream.read_exact(&mut frame)?;
    Ok(Some(frame))
}

fn write_frame(stream: &mut TcpStream, frame: &[u8]) -> io::Result<()> {
    let len = frame.len() as u32;
    let mut buffer = Vec::with_capacity(4 + frame.len());
    buffer.extend_from_slice(&len.to_le_bytes());
    buffer.extend_from_slice(frame);
    stream.write_all(&buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let client = TcpStream::connect(addr).expect("connect");
        let (server, _) = listener.accept().expect("accept");
        (client, server)
    }

    #[test]
    fn frames_round_trip_over_loopback() {
        let (mut writer, mut reader) = loopback_pair();
        write_frame(&mut writer, br#"{"key":"request_mission"}"#).unwrap();
        write_frame(&mut writer, b"").unwrap();

        let first = read_frame(&mut reader).unwrap().unwrap();
        assert_eq!(first, br#"{"key":"request_mission"}"#);
        let second = read_frame(&mut reader).unwrap().unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn clean_close_reads_as_none() {
        let (writer, mut reader) = loopback_pair();
        drop(writer);
        assert!(read_frame(&mut reader).unwrap().is_none());
    }
}
