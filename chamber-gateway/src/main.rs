use chamber_gateway::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    let state = AppState::new(config);

    // Endpoint-group handlers (auth, control, pressure, ...) live in their
    // own crates and are mounted here as they come online.
    let api = ApiRouter::new();

    Server::new(state).serve(api).await
}
