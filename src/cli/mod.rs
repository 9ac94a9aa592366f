mod commands;
mod handlers;

pub use commands::{Cli, Commands, PdfAction, PdfCommand};
pub use handlers::{handle_pdf_merge, handle_pdf_rotate, handle_serve};
