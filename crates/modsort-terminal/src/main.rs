mod sorter;

use std::path::PathBuf;

use modsort::run::Run;
use modsort::Classification;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
enum Error {
	#[error("{0}")]
	Modsort(#[from] modsort::Error),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("mods folder not found at {0}")]
	MissingModsFolder(PathBuf),
	#[error("run task failed: {0}")]
	Join(#[from] tokio::task::JoinError),
}

#[tokio::main]
async fn main() {
	env_logger::init();

	let mut opts;

	/* Parse console input */
	let parsed_options = {
		let args: Vec<String> = std::env::args().collect();

		opts = getopts::Options::new();
		opts.optflag( "h", "help",        "Show help");
		opts.optopt(  "s", "server",      "Sync server URL", "URL");
		opts.optflag( "",  "offline",     "Skip syncing with the server");
		opts.optopt(  "i", "index",       "Path of the wiki index file", "FILE");
		opts.optflag( "",  "fetch-index", "Download a fresh wiki index before the run");
		opts.optopt(  "d", "data-dir",    "Folder holding the config, cache and index", "DIR");
		opts.optflag( "",  "save-config", "Write the resulting config back to disk");
		opts.parsing_style(getopts::ParsingStyle::FloatingFrees);

		let parsed_options = match opts.parse(&args[1..]) {
			Ok(m)  => { m }
			Err(e) => { println!("Unable to parse options: {}", e); return }
		};

		if parsed_options.opt_present("h") || parsed_options.free.is_empty() {
			eprintln!("{}", opts.usage("Usage: modsort-terminal [options] GAME_DIR"));
			return;
		}

		parsed_options
	};

	let mut config = modsort::Config::load_from_disk().unwrap_or_else(|e| {
		log::warn!("Failed to read config file: {}", e);
		log::warn!("Using default config.");
		modsort::Config::default()
	});

	if let Some(dir) = parsed_options.opt_str("data-dir") {
		config.set_data_dir(PathBuf::from(dir));
	}
	if let Some(index) = parsed_options.opt_str("index") {
		config.set_index_path(PathBuf::from(index));
	}
	if let Some(server) = parsed_options.opt_str("server") {
		config.set_server_url(Some(server));
	}
	if parsed_options.opt_present("offline") {
		config.set_server_url(None);
	}

	if parsed_options.opt_present("save-config") {
		if let Err(e) = config.save_to_disk() {
			log::error!("Failed to save config: {}", e);
		}
	}

	let game_dir = PathBuf::from(&parsed_options.free[0]);
	match run(config, game_dir, parsed_options.opt_present("fetch-index")).await {
		Ok(()) => {}
		Err(e) => log::error!("Run failed: {}", e),
	}
}

async fn run(config: modsort::Config, game_dir: PathBuf, fetch_index: bool) -> Result<(), Error> {
	let mods_dir = game_dir.join("mods");
	if !mods_dir.is_dir() {
		return Err(Error::MissingModsFolder(mods_dir));
	}

	let client = config.build_client()?;

	if fetch_index || !config.index_path().exists() {
		if let Err(e) = modsort::wiki::index::download_index(&client, config.index_url(), config.index_path()).await {
			log::warn!("Failed to download wiki index, continuing without it: {}", e);
		}
	}

	let mut sink = sorter::FolderSorter::prepare(&game_dir)?;

	let cancel = CancellationToken::new();
	let task = {
		let cancel = cancel.clone();
		let client = client.clone();
		let config = config.clone();
		tokio::spawn(async move {
			let run = Run::from_config(&config, &client, mods_dir);
			run.execute(|| modsort::Classifier::from_config(&config, client), &mut sink, &cancel).await
		})
	};

	let ctrl_c = {
		let cancel = cancel.clone();
		tokio::spawn(async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				log::warn!("Interrupted, stopping after the current package.");
				cancel.cancel();
			}
		})
	};

	let report = task.await??;
	ctrl_c.abort();

	let count = |c: Classification| report.results.iter().filter(|(_, r)| r.classification == c).count();
	log::info!(
		"Classified {} packages: {} required, {} optional, {} unsupported, {} unknown",
		report.results.len(),
		count(Classification::Required),
		count(Classification::Optional),
		count(Classification::Unsupported),
		count(Classification::Unknown),
	);
	if report.cancelled {
		log::warn!("Run was cancelled, nothing was uploaded.");
	}

	Ok(())
}
