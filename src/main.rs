mod app;
mod replies;
mod telegram;
mod util;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the result.json produced by Telegram's "Export chat history".
    #[arg(long, default_value = "result.json")]
    export: String,
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "reply-lens",
        options,
        Box::new(move |cc| Ok(Box::new(app::ReplyLensApp::new(cc, args.export.clone())))),
    )
}
