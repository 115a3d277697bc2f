//! Development helper that signs bearer tokens the gateway will accept.

use clap::Parser;
use uuid::Uuid;

use auth_gateway::auth::jwt::{now_secs, sign, Audience, Claims};
use auth_gateway::config::SigningAlgorithm;

#[derive(Parser)]
#[command(name = "mint-token")]
#[command(about = "Sign a bearer token for the auth-gateway", long_about = None)]
struct Cli {
    /// Symmetric signing key.
    #[arg(short, long, env = "GATEWAY_SIGNING_KEY")]
    key: String,

    /// `iss` claim.
    #[arg(short, long)]
    issuer: String,

    /// `aud` claim.
    #[arg(short, long)]
    audience: String,

    /// `sub` claim.
    #[arg(short, long)]
    subject: Option<String>,

    /// Lifetime in seconds.
    #[arg(long, default_value_t = 3600)]
    ttl_secs: u64,

    /// Signature algorithm (HS256, HS384, HS512).
    #[arg(long, default_value = "HS256", value_parser = parse_algorithm)]
    algorithm: SigningAlgorithm,
}

fn parse_algorithm(value: &str) -> Result<SigningAlgorithm, String> {
    match value.to_ascii_uppercase().as_str() {
        "HS256" => Ok(SigningAlgorithm::HS256),
        "HS384" => Ok(SigningAlgorithm::HS384),
        "HS512" => Ok(SigningAlgorithm::HS512),
        other => Err(format!("unsupported algorithm `{}`", other)),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let now = now_secs();
    let claims = Claims {
        sub: cli.subject,
        iss: cli.issuer,
        aud: Audience::One(cli.audience),
        exp: now + cli.ttl_secs,
        iat: Some(now),
        nbf: None,
        jti: Some(Uuid::new_v4().to_string()),
    };

    let token = sign(&claims, cli.key.as_bytes(), cli.algorithm.into())?;
    println!("{}", token);
    Ok(())
}
