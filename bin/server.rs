use clap::{Arg, ArgAction, Command};
use company_catalog::server::{init_tracing, load_init_file, open_repository};
use company_catalog::{start_server, CatalogService, CompanyService, Config};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("catalog-server")
        .about("Serve company records over HTTP")
        .arg(Arg::new("address").long("address").help("host:port to bind (overrides ADDRESS)"))
        .arg(
            Arg::new("init-file")
                .long("init-file")
                .help("Company file loaded at startup (overrides INIT_FILE)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(Arg::new("no-bootstrap").long("no-bootstrap").help("Skip the startup load").action(ArgAction::SetTrue))
        .get_matches();

    dotenvy::dotenv().ok();
    let mut config = Config::load()?;
    if let Some(address) = matches.get_one::<String>("address") {
        config.address = address.clone();
    }
    if let Some(path) = matches.get_one::<PathBuf>("init-file") {
        config.init_file = path.clone();
    }

    init_tracing(&config);

    let repository = open_repository(&config).await?;
    let service: Arc<dyn CompanyService> = Arc::new(CatalogService::new(repository));

    if !matches.get_flag("no-bootstrap") {
        load_init_file(service.as_ref(), &config).await;
    }

    start_server(config, service).await
}
