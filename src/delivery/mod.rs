pub mod nats;
pub mod push;
