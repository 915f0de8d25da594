//! Minimal line client: stdin goes to the server, server lines go to stdout.
//! Any telnet client works just as well.

use clap::Parser;
use log::info;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:1234")]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    info!("Connecting to: {}", args.server);
    let stream = TcpStream::connect(&args.server).await?;
    let (read_half, mut write_half) = stream.into_split();

    let mut server_lines = BufReader::new(read_half).lines();
    let mut input_lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = server_lines.next_line() => match line? {
                Some(line) => {
                    stdout.write_all(line.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                    stdout.flush().await?;
                }
                None => {
                    info!("Server closed the connection");
                    break;
                }
            },
            line = input_lines.next_line() => match line? {
                Some(line) => {
                    write_half.write_all(line.as_bytes()).await?;
                    write_half.write_all(b"\r\n").await?;
                }
                None => {
                    // stdin closed; let the server see EOF and drain its reply
                    write_half.shutdown().await?;
                    while let Some(line) = server_lines.next_line().await? {
                        stdout.write_all(line.as_bytes()).await?;
                        stdout.write_all(b"\n").await?;
                    }
                    stdout.flush().await?;
                    break;
                }
            },
        }
    }

    Ok(())
}
