use geoplaces::config::Config;
use geoplaces::db::PgStore;
use geoplaces::engine::Engine;
use geoplaces::error::Error;
use geoplaces::server::serve;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let store = PgStore::new(&config.database_url, config.max_connections).await?;
    let engine = Engine::new(store);

    serve(engine, config.listen_addr).await
}
