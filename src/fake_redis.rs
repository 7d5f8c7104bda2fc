//! In-process RESP listener for exercising the Redis clients without a
//! real server. Each command is logged and answered by a caller-supplied
//! function returning a raw RESP reply.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};

type Reply = Arc<dyn Fn(&[String]) -> String + Send + Sync>;

pub struct FakeRedis {
    pub url: String,
    commands: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeRedis {
    /// Binds an ephemeral port and serves every connection with `reply`.
    pub async fn start<F>(reply: F) -> Self
    where
        F: Fn(&[String]) -> String + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("redis://{}/0", listener.local_addr().unwrap());
        let commands = Arc::new(Mutex::new(Vec::new()));
        let reply: Reply = Arc::new(reply);

        let log = commands.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve(socket, reply.clone(), log.clone()));
            }
        });

        Self { url, commands }
    }

    /// PONG for PING, OK for everything else.
    pub fn ok_reply(command: &[String]) -> String {
        match command.first().map(|name| name.to_ascii_uppercase()).as_deref() {
            Some("PING") => "+PONG\r\n".to_string(),
            _ => "+OK\r\n".to_string(),
        }
    }

    /// Every received command named `name`, arguments included.
    pub fn received(&self, name: &str) -> Vec<Vec<String>> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|command| {
                command
                    .first()
                    .is_some_and(|first| first.eq_ignore_ascii_case(name))
            })
            .cloned()
            .collect()
    }
}

async fn serve(socket: TcpStream, reply: Reply, commands: Arc<Mutex<Vec<Vec<String>>>>) {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);

    while let Some(command) = read_command(&mut reader).await {
        let response = reply(&command);
        commands.lock().unwrap().push(command);
        if write.write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}

/// Reads one `*N` array of bulk strings.
async fn read_command(reader: &mut BufReader<OwnedReadHalf>) -> Option<Vec<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line).await.ok()? == 0 {
        return None;
    }
    let count: usize = line.trim_end().strip_prefix('*')?.parse().ok()?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await.ok()?;
        let len: usize = line.trim_end().strip_prefix('$')?.parse().ok()?;

        let mut buf = vec![0; len + 2];
        reader.read_exact(&mut buf).await.ok()?;
        buf.truncate(len);
        args.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Some(args)
}
