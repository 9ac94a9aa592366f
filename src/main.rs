use clap::Parser;
use ionix::cli::{handle_pdf_merge, handle_pdf_rotate, handle_serve, Cli, Commands, PdfAction};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ionix=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config, bind } => handle_serve(config, bind).await,
        Commands::Pdf(pdf) => match pdf.action {
            PdfAction::Merge {
                inputs,
                output,
                json,
            } => handle_pdf_merge(inputs, output, json),
            PdfAction::Rotate {
                input,
                output,
                json,
            } => handle_pdf_rotate(input, output, json),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
