use callscope::{CallOptions, Channel, ClientCall, MethodType};

use super::{Harness, expect_ok, finish, listener, next_reply, request_headers};
use crate::AnyResult;
use crate::greeter::{self, HelloReply, HelloRequest};

pub async fn run(harness: &Harness) -> AnyResult<()> {
    let method = greeter::method(greeter::SAY_HELLO_BIDI_STREAM, MethodType::BidiStreaming);
    let mut call = harness
        .channel()
        .new_call::<HelloRequest, HelloReply>(&method, CallOptions::default());
    let (listener, mut events) = listener::<HelloReply>();

    call.start(listener, request_headers());
    for name in ["BidiUser1", "BidiUser2", "BidiUser3"] {
        call.request(1);
        call.send_message(HelloRequest::new(name));
        let reply = next_reply(&mut events).await?;
        println!("bidi reply: {}", reply.message);
    }
    call.half_close();

    let (trailing, status) = finish(&mut events).await?;
    expect_ok("bidi", &status)?;
    if !trailing.is_empty() {
        return Err(format!("bidi: {} unexpected replies after half-close", trailing.len()));
    }
    harness.report("bidi")
}
