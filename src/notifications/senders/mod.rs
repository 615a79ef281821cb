use thiserror::Error;

pub mod resend;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Email API rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("{0} not configured")]
    NotConfigured(&'static str),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Templating error: {0}")]
    TemplatingError(#[from] tera::Error),
}
