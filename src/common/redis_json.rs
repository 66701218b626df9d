use redis::{RedisWrite, ToRedisArgs};
use serde::Serialize;

/// Publishes a value as its JSON encoding.
#[repr(transparent)]
pub struct Json<T>(pub T);

impl<T: Serialize> ToRedisArgs for Json<T> {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        let json_encoded = serde_json::to_string(&self.0).expect("Failed to serialize JSON");
        json_encoded.write_redis_args(out);
    }
}
