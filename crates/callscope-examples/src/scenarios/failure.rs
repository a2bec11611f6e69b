use callscope::{CallOptions, Channel, ClientCall, MethodType};
use tonic::Code;

use super::{Harness, finish, listener, request_headers};
use crate::AnyResult;
use crate::greeter::{self, HelloReply, HelloRequest};

pub async fn run(harness: &Harness) -> AnyResult<()> {
    let method = greeter::method(greeter::SAY_HELLO_REFUSED, MethodType::Unary);
    let mut call = harness
        .channel()
        .new_call::<HelloRequest, HelloReply>(&method, CallOptions::default());
    let (listener, mut events) = listener::<HelloReply>();

    call.start(listener, request_headers());
    call.request(1);
    call.send_message(HelloRequest::new("FailingUser"));
    call.half_close();

    let (replies, status) = finish(&mut events).await?;
    if status.code() != Code::Unavailable || !replies.is_empty() {
        return Err(format!(
            "failure: expected UNAVAILABLE with no replies, got {:?} with {} replies",
            status.code(),
            replies.len()
        ));
    }
    println!("failure status seen by caller: {}", status.message());
    harness.report("failure")
}
