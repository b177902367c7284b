#[tokio::main]
async fn main() {
	env_logger::init();

	let mut opts = getopts::Options::new();
	opts.optflag("h", "help", "Show help");
	opts.optopt("b", "bind", "Address to listen on (default 127.0.0.1:5000)", "ADDR");
	opts.optopt("d", "data-dir", "Folder holding mod_environments.json (default ./data)", "DIR");
	opts.optopt("", "backup-dir", "Folder for daily backups (default ./backups)", "DIR");

	let args: Vec<String> = std::env::args().collect();
	let parsed_options = match opts.parse(&args[1..]) {
		Ok(m) => m,
		Err(e) => { eprintln!("Unable to parse options: {}", e); return }
	};

	if parsed_options.opt_present("h") {
		eprintln!("{}", opts.usage("Usage: modsort-server [options]"));
		return;
	}

	let bind = parsed_options.opt_str("bind").unwrap_or_else(|| "127.0.0.1:5000".to_string());
	let data_dir = parsed_options.opt_str("data-dir").unwrap_or_else(|| "data".to_string());
	let backup_dir = parsed_options.opt_str("backup-dir").unwrap_or_else(|| "backups".to_string());

	for dir in [&data_dir, &backup_dir] {
		if let Err(e) = std::fs::create_dir_all(dir) {
			log::error!("Failed to create {}: {}", dir, e);
			return;
		}
	}

	let app = modsort_server::build_router(modsort_server::AppState::new(&data_dir, &backup_dir));

	let listener = match tokio::net::TcpListener::bind(&bind).await {
		Ok(l) => l,
		Err(e) => { log::error!("Failed to bind {}: {}", bind, e); return }
	};
	log::info!("Listening on {}, store in {}, backups in {}", bind, data_dir, backup_dir);

	if let Err(e) = axum::serve(listener, app).await {
		log::error!("Server error: {}", e);
	}
}
