use callscope::{CallOptions, Channel, ClientCall, MethodType};

use super::{Harness, expect_ok, finish, listener, request_headers};
use crate::AnyResult;
use crate::greeter::{self, HelloReply, HelloRequest};

pub async fn run(harness: &Harness) -> AnyResult<()> {
    let method = greeter::method(greeter::SAY_HELLO, MethodType::Unary);
    let mut call = harness
        .channel()
        .new_call::<HelloRequest, HelloReply>(&method, CallOptions::default());
    let (listener, mut events) = listener::<HelloReply>();

    call.start(listener, request_headers());
    call.request(1);
    call.send_message(HelloRequest::new("UnaryUser"));
    call.half_close();

    let (replies, status) = finish(&mut events).await?;
    expect_ok("unary", &status)?;
    for reply in &replies {
        println!("unary reply: {}", reply.message);
    }
    harness.report("unary")
}
