use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("wizard error: {0}")]
    Wizard(#[from] wizard::WizardError),

    #[error("startup failed: {0}")]
    Startup(#[from] anyhow::Error),
}
