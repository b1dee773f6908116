mod common;
mod dispatch;
mod disputes;
