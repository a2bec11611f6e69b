//! The demo service: one greeting method per call shape plus one that
//! always fails.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use callscope::{Message, MethodDescriptor, MethodType};
use tonic::Status;

use crate::loopback::{Requests, Responder};

pub const SERVICE: &str = "greeter.Greeter";

pub const SAY_HELLO: &str = "SayHello";
pub const SAY_HELLO_SERVER_STREAM: &str = "SayHelloServerStream";
pub const SAY_HELLO_CLIENT_STREAM: &str = "SayHelloClientStream";
pub const SAY_HELLO_BIDI_STREAM: &str = "SayHelloBidiStream";
pub const SAY_HELLO_REFUSED: &str = "SayHelloRefused";

const SERVER_STREAM_PARTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloRequest {
    pub name: String,
}

impl HelloRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloReply {
    pub message: String,
}

impl HelloReply {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn method(name: &str, method_type: MethodType) -> MethodDescriptor {
    MethodDescriptor::new(format!("{SERVICE}/{name}"), method_type)
}

pub struct Greeter {
    /// Delay between streamed replies.
    pace: Duration,
}

impl Greeter {
    pub fn new(pace: Duration) -> Self {
        Self { pace }
    }

    pub async fn handle<Resp: Message>(
        &self,
        method: &MethodDescriptor,
        requests: &mut Requests,
        responses: &mut Responder<Resp>,
    ) -> Result<(), Status> {
        match method.bare_method_name() {
            SAY_HELLO => {
                let request: HelloRequest = requests.expect_one().await?;
                responses.send(HelloReply::new(format!("Hello {} (Unary)", request.name)))
            }
            SAY_HELLO_SERVER_STREAM => {
                let request: HelloRequest = requests.expect_one().await?;
                for part in 1..=SERVER_STREAM_PARTS {
                    tokio::time::sleep(self.pace).await;
                    responses.send(HelloReply::new(format!(
                        "Hello {}, part {part} (Server Stream)",
                        request.name
                    )))?;
                }
                Ok(())
            }
            SAY_HELLO_CLIENT_STREAM => {
                let mut names = Vec::new();
                while let Some(request) = requests.next::<HelloRequest>().await? {
                    names.push(request.name);
                }
                responses.send(HelloReply::new(format!(
                    "Hello {}! (Client Stream)",
                    names.join(", ")
                )))
            }
            SAY_HELLO_BIDI_STREAM => {
                while let Some(request) = requests.next::<HelloRequest>().await? {
                    responses.send(HelloReply::new(format!(
                        "Server acknowledges: {} (Bidi Stream)",
                        request.name
                    )))?;
                }
                Ok(())
            }
            SAY_HELLO_REFUSED => {
                let request: HelloRequest = requests.expect_one().await?;
                let mut status =
                    Status::unavailable(format!("greeter refused to greet {}", request.name));
                status.set_source(Arc::new(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "upstream connection refused",
                )));
                Err(status)
            }
            other => Err(Status::unimplemented(format!(
                "{} has no method {other}",
                method.service_name()
            ))),
        }
    }
}
