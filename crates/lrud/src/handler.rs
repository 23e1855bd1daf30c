//! Command handler for the RESP server

use std::sync::Arc;

use lrucache::LruCache;

use crate::resp::RespValue;

/// Cache served over the wire: raw byte keys to raw byte values
pub type ByteCache = LruCache<Vec<u8>, Vec<u8>>;

pub struct CommandHandler {
    cache: Arc<ByteCache>,
}

impl CommandHandler {
    pub fn new(cache: Arc<ByteCache>) -> Self {
        Self { cache }
    }

    pub fn handle(&self, cmd: RespValue) -> RespValue {
        let args = match cmd {
            RespValue::Array(Some(args)) if !args.is_empty() => args,
            _ => return RespValue::error("ERR invalid command format"),
        };

        let command = match &args[0] {
            RespValue::BulkString(Some(name)) => String::from_utf8_lossy(name).to_uppercase(),
            _ => return RespValue::error("ERR invalid command"),
        };

        let args = &args[1..];
        match command.as_str() {
            "PING" => self.handle_ping(args),
            "ECHO" => self.handle_echo(args),
            "GET" => self.handle_get(args),
            "SET" => self.handle_set(args),
            "EXISTS" => self.handle_exists(args),
            "DBSIZE" => self.handle_dbsize(args),
            "FLUSHDB" | "FLUSHALL" => self.handle_flush(&command, args),
            "INFO" => self.handle_info(),
            // redis-cli probes this on connect
            "COMMAND" => RespValue::Array(Some(vec![])),
            _ => RespValue::error(format!("ERR unknown command '{}'", command)),
        }
    }

    fn handle_ping(&self, args: &[RespValue]) -> RespValue {
        match args {
            [] => RespValue::SimpleString("PONG".to_string()),
            [message] => message.clone(),
            _ => wrong_arity("ping"),
        }
    }

    fn handle_echo(&self, args: &[RespValue]) -> RespValue {
        match args {
            [message] => message.clone(),
            _ => wrong_arity("echo"),
        }
    }

    fn handle_get(&self, args: &[RespValue]) -> RespValue {
        let [key] = args else {
            return wrong_arity("get");
        };
        let Some(key) = bulk(key) else {
            return RespValue::error("ERR invalid key type");
        };

        RespValue::BulkString(self.cache.get(key))
    }

    fn handle_set(&self, args: &[RespValue]) -> RespValue {
        match args {
            [key, value] => {
                let (Some(key), Some(value)) = (bulk(key), bulk(value)) else {
                    return RespValue::error("ERR invalid key or value type");
                };
                self.cache.set(key.to_vec(), value.to_vec());
                RespValue::ok()
            }
            // Expiry and conditional options are not supported
            [_, _, ..] => RespValue::error("ERR syntax error"),
            _ => wrong_arity("set"),
        }
    }

    fn handle_exists(&self, args: &[RespValue]) -> RespValue {
        if args.is_empty() {
            return wrong_arity("exists");
        }

        let count = args
            .iter()
            .filter_map(bulk)
            .filter(|key| self.cache.contains(*key))
            .count();
        RespValue::Integer(count as i64)
    }

    fn handle_dbsize(&self, args: &[RespValue]) -> RespValue {
        if !args.is_empty() {
            return wrong_arity("dbsize");
        }
        RespValue::Integer(self.cache.len() as i64)
    }

    fn handle_flush(&self, command: &str, args: &[RespValue]) -> RespValue {
        // ASYNC/SYNC modifiers are accepted; clearing is always immediate
        if args.len() > 1 {
            return wrong_arity(&command.to_lowercase());
        }
        self.cache.clear();
        RespValue::ok()
    }

    fn handle_info(&self) -> RespValue {
        let info = format!(
            "# Server\r\n\
             lrud_version:{}\r\n\
             \r\n\
             # Keyspace\r\n\
             cache_size:{}\r\n\
             cache_capacity:{}\r\n",
            env!("CARGO_PKG_VERSION"),
            self.cache.len(),
            self.cache.capacity(),
        );
        RespValue::BulkString(Some(info.into_bytes()))
    }
}

fn bulk(value: &RespValue) -> Option<&[u8]> {
    match value {
        RespValue::BulkString(Some(bytes)) => Some(bytes.as_slice()),
        _ => None,
    }
}

fn wrong_arity(command: &str) -> RespValue {
    RespValue::error(format!(
        "ERR wrong number of arguments for '{}' command",
        command
    ))
}
