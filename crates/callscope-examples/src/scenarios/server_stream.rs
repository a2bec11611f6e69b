use callscope::{CallOptions, Channel, ClientCall, MethodType};

use super::{Harness, expect_ok, finish, listener, request_headers};
use crate::AnyResult;
use crate::greeter::{self, HelloReply, HelloRequest};

pub async fn run(harness: &Harness) -> AnyResult<()> {
    let method = greeter::method(greeter::SAY_HELLO_SERVER_STREAM, MethodType::ServerStreaming);
    let mut call = harness
        .channel()
        .new_call::<HelloRequest, HelloReply>(&method, CallOptions::default());
    let (listener, mut events) = listener::<HelloReply>();

    call.start(listener, request_headers());
    call.request(3);
    call.send_message(HelloRequest::new("ServerStreamUser"));
    call.half_close();

    let (replies, status) = finish(&mut events).await?;
    expect_ok("server-stream", &status)?;
    if replies.len() != 3 {
        return Err(format!(
            "server-stream: expected 3 replies, got {}",
            replies.len()
        ));
    }
    for reply in &replies {
        println!("server-stream reply: {}", reply.message);
    }
    harness.report("server-stream")
}
