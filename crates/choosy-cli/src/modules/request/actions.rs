use std::time::Duration;

use choosy_client::{AuthMode, ClientError, RequestOptions};
use reqwest::Method;
use serde_json::Value;

use crate::cli_args::RequestArgs;
use crate::modules::system::CommandContext;
use crate::ME_PATH;

const NOT_LOGGED_IN: &str = "not logged in; run `choosy login`";

pub(crate) async fn handle_request(args: RequestArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let gated = args.gated;
    let path = args.path.clone();
    let options = build_options(&args)?;
    let body: Option<Value> = if gated {
        ctx.client
            .call_gated(&path, options)
            .await
            .map_err(explain)?
    } else {
        Some(ctx.client.call(&path, options).await.map_err(explain)?)
    };
    match body {
        None => anyhow::bail!(NOT_LOGGED_IN),
        Some(Value::Null) => {}
        Some(body) => println!("{}", serde_json::to_string_pretty(&body)?),
    }
    Ok(())
}

pub(crate) async fn handle_whoami(ctx: &CommandContext) -> anyhow::Result<()> {
    let me: Option<Value> = ctx
        .client
        .call_gated(ME_PATH, RequestOptions::get())
        .await
        .map_err(explain)?;
    let Some(me) = me else {
        anyhow::bail!(NOT_LOGGED_IN);
    };
    println!("{}", serde_json::to_string_pretty(&me)?);
    Ok(())
}

pub(crate) fn build_options(args: &RequestArgs) -> anyhow::Result<RequestOptions> {
    let method = Method::from_bytes(args.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| anyhow::anyhow!("invalid HTTP method: {}", args.method))?;
    let mut options = RequestOptions::new(method);
    if let Some(data) = args.data.as_deref() {
        let body: Value = serde_json::from_str(data)
            .map_err(|err| anyhow::anyhow!("--data is not valid JSON: {err}"))?;
        options = options.json(body);
    }
    if !args.form.is_empty() {
        let pairs = args
            .form
            .iter()
            .map(|field| parse_pair(field, '='))
            .collect::<anyhow::Result<Vec<_>>>()?;
        options = options.form(pairs);
    }
    for param in &args.query {
        let (key, value) = parse_pair(param, '=')?;
        options = options.query(key, value);
    }
    for header in &args.headers {
        let (name, value) = parse_pair(header, ':')?;
        options = options.header(name, value);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        options = options.timeout(Duration::from_millis(timeout_ms));
    }
    if args.anonymous {
        options = options.auth(AuthMode::Anonymous);
    }
    Ok(options)
}

pub(crate) fn parse_pair(value: &str, separator: char) -> anyhow::Result<(String, String)> {
    let (key, rest) = value
        .split_once(separator)
        .ok_or_else(|| anyhow::anyhow!("expected KEY{separator}VALUE, got '{value}'"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("empty key in '{value}'");
    }
    Ok((key.to_string(), rest.trim().to_string()))
}

fn explain(err: ClientError) -> anyhow::Error {
    if err.is_authentication_expired() {
        anyhow::anyhow!("{err}; run `choosy login`")
    } else {
        anyhow::Error::new(err)
    }
}
