//! 交互式无密码登录演示
//!
//! ```bash
//! otp-demo --email user@example.com
//! OTP_TTL_SECS=120 RUST_LOG=otpauth=debug otp-demo --email user@example.com
//! ```
//!
//! 输入验证码登录；输入 `resend` 重新获取验证码；输入 `quit` 退出。
//! 结束时打印记录到的领域事件（JSON）。

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use otpauth::audit::InMemoryEventSink;
use otpauth::error::{Error, ValidationError};
use otpauth::passwordless::{InAppDelivery, OtpConfig, OtpLogin, OtpManager, ValidationOutcome};
use otpauth::session::SessionManager;

#[derive(Parser)]
#[command(about = "Passwordless email + one-time code login demo")]
struct Args {
    /// Email address to log in with
    #[arg(long)]
    email: String,

    /// Code lifetime in seconds
    #[arg(long, env = "OTP_TTL_SECS")]
    ttl: Option<u64>,

    /// Maximum validation attempts per code
    #[arg(long, env = "OTP_MAX_ATTEMPTS")]
    attempts: Option<u32>,

    /// Number of digits in a code
    #[arg(long, env = "OTP_CODE_LENGTH")]
    code_length: Option<usize>,
}

impl Args {
    fn config(&self) -> Result<OtpConfig> {
        let mut config = OtpConfig::default();
        if let Some(secs) = self.ttl {
            anyhow::ensure!(secs > 0, "--ttl must be greater than 0");
            config = config.with_ttl(Duration::from_secs(secs));
        }
        if let Some(max) = self.attempts {
            anyhow::ensure!(max > 0, "--attempts must be greater than 0");
            config = config.with_max_attempts(max);
        }
        if let Some(length) = self.code_length {
            anyhow::ensure!(
                (4..=10).contains(&length),
                "--code-length must be between 4 and 10"
            );
            config = config.with_code_length(length);
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("otpauth=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config()?;

    let events = InMemoryEventSink::new();
    let mailbox = InAppDelivery::new();
    let otp = OtpManager::new(config)
        .with_event_sink(Arc::new(events.clone()))
        .with_delivery(Arc::new(mailbox.clone()));
    let sessions = SessionManager::new().with_event_sink(Arc::new(events.clone()));
    let login = OtpLogin::new(Arc::new(otp), Arc::new(sessions));

    let issued = login
        .request_code(&args.email)
        .context("failed to issue code")?;
    let email = issued.email.clone();
    show_code(&mailbox, &email, issued.expires_at);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("code> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let input = line?;
        let input = input.trim();

        match input {
            "" => continue,
            "quit" => break,
            "resend" => {
                let issued = login.resend(&email).context("failed to resend code")?;
                show_code(&mailbox, &email, issued.expires_at);
                continue;
            }
            _ => {}
        }

        match login.submit(&email, input) {
            Ok(attempt) => match attempt.outcome {
                ValidationOutcome::Success { attempts } => {
                    println!("Logged in as {email} after {attempts} attempt(s).");
                    break;
                }
                ValidationOutcome::Failure(failure) => {
                    println!(
                        "{failure} ({} attempt(s) left). Type `resend` for a new code.",
                        attempt.remaining_attempts
                    );
                }
            },
            Err(Error::Validation(ValidationError::InvalidCode { expected })) => {
                println!("Please enter exactly {expected} digits.");
            }
            Err(e) => return Err(e).context("validation failed"),
        }
    }

    if let Some(duration) = login.logout()? {
        println!("Logged out after {}s.", duration.num_seconds());
    }

    println!("{}", serde_json::to_string_pretty(&events.events())?);
    Ok(())
}

fn show_code(mailbox: &InAppDelivery, email: &str, expires_at: chrono::DateTime<chrono::Utc>) {
    match mailbox.latest_for(email) {
        Some(code) => println!(
            "Your code for {email} is {code} (expires {}).",
            expires_at.format("%H:%M:%S UTC")
        ),
        None => println!("No code delivered for {email}."),
    }
}
