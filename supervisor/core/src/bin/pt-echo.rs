//! Stand-in transport for local testing
//!
//! Accepts the flashlight command line, binds the `-addr` it was given and
//! echoes every connection back to itself. Install it as
//! `<root>/pt/flashlight/flashlight` to exercise the supervisor without the
//! real transport.
//!
//! `-never-listen` keeps the process alive without binding, for exercising
//! readiness timeouts. Unknown flags are ignored.

use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;

#[derive(Debug, Default)]
struct EchoArgs {
    addr: Option<SocketAddr>,
    never_listen: bool,
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<EchoArgs, String> {
    let mut parsed = EchoArgs::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-addr" => {
                let value = args.next().ok_or("-addr requires a value")?;
                let addr = value
                    .parse()
                    .map_err(|e| format!("invalid -addr '{value}': {e}"))?;
                parsed.addr = Some(addr);
            }
            "-server" | "-masquerade" | "-configDir" => {
                args.next();
            }
            "-never-listen" => parsed.never_listen = true,
            _ => {}
        }
    }

    Ok(parsed)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("pt-echo: {e}");
            return ExitCode::from(2);
        }
    };

    if args.never_listen {
        std::future::pending::<()>().await;
    }

    let Some(addr) = args.addr else {
        eprintln!("pt-echo: missing -addr");
        return ExitCode::from(2);
    };

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("pt-echo: failed to bind {addr}: {e}");
            return ExitCode::FAILURE;
        }
    };

    loop {
        let Ok((mut stream, _)) = listener.accept().await else {
            continue;
        };
        tokio::spawn(async move {
            let (mut reader, mut writer) = stream.split();
            let _ = tokio::io::copy(&mut reader, &mut writer).await;
        });
    }
}
