//! Socket-level integration tests for the control protocol

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mursal_common::Signal;
use mursal_control::{
    CommandHandler, ControlClient, ControlServer, EngineCommand, Request, RequestCommand,
    Response, ResponseData, ResponsePayload, SystemCommand, SystemStatus,
};
use tokio::sync::broadcast;

struct EchoHandler;

#[async_trait]
impl CommandHandler for EchoHandler {
    async fn handle_request(&self, request: Request) -> mursal_control::Result<Response> {
        if !request.is_version_compatible() {
            return Err(mursal_control::ControlError::ServerError(
                "incompatible protocol version".to_string(),
            ));
        }

        Ok(match request.command {
            RequestCommand::System(SystemCommand::Ping) => {
                Response::data(ResponseData::Message("pong".to_string()))
            }
            RequestCommand::System(SystemCommand::Status) => {
                Response::data(ResponseData::SystemStatus(SystemStatus {
                    version: "test".to_string(),
                    uptime_secs: 1,
                    queue_backend: "in-process".to_string(),
                    engine_running: false,
                    transport_connected: true,
                }))
            }
            RequestCommand::Engine(EngineCommand::Stop) => Response::ok(),
            _ => Response::error("unhandled in test"),
        })
    }
}

async fn start_server(socket_path: String) -> broadcast::Sender<Signal> {
    let (shutdown, _) = broadcast::channel(4);
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let server = ControlServer::new(socket_path, Arc::new(EchoHandler));
        let _ = server.serve(receiver).await;
    });
    // Give the listener a moment to bind.
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown
}

#[tokio::test]
async fn test_ping_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("mursal.sock").to_string_lossy().into_owned();
    let shutdown = start_server(socket.clone()).await;

    let client = ControlClient::new(socket);
    let response = client
        .send_request(Request::new(RequestCommand::System(SystemCommand::Ping)))
        .await
        .expect("roundtrip succeeds");

    match response.payload {
        ResponsePayload::Data(data) => match *data {
            ResponseData::Message(message) => assert_eq!(message, "pong"),
            other => panic!("unexpected data: {other:?}"),
        },
        other => panic!("unexpected payload: {other:?}"),
    }

    let _ = shutdown.send(Signal::Shutdown);
}

#[tokio::test]
async fn test_structured_status_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("mursal.sock").to_string_lossy().into_owned();
    let shutdown = start_server(socket.clone()).await;

    let client = ControlClient::new(socket);
    let response = client
        .send_request(Request::new(RequestCommand::System(SystemCommand::Status)))
        .await
        .expect("roundtrip succeeds");

    match response.payload {
        ResponsePayload::Data(data) => match *data {
            ResponseData::SystemStatus(status) => {
                assert_eq!(status.queue_backend, "in-process");
                assert!(status.transport_connected);
            }
            other => panic!("unexpected data: {other:?}"),
        },
        other => panic!("unexpected payload: {other:?}"),
    }

    let _ = shutdown.send(Signal::Shutdown);
}

#[tokio::test]
async fn test_server_reports_handler_errors() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("mursal.sock").to_string_lossy().into_owned();
    let shutdown = start_server(socket.clone()).await;

    let client = ControlClient::new(socket);
    let mut request = Request::new(RequestCommand::System(SystemCommand::Ping));
    request.version = 999;

    let response = client.send_request(request).await.expect("transport ok");
    match response.payload {
        ResponsePayload::Error(message) => {
            assert!(message.contains("incompatible"), "{message}");
        }
        other => panic!("unexpected payload: {other:?}"),
    }

    let _ = shutdown.send(Signal::Shutdown);
}
