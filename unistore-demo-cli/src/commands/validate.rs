//! Submit a receipt to a validation endpoint

use anyhow::Result;
use unistore_lib::validator::{
    HttpValidator, ReceiptEncoding, ReceiptValidator, ValidationVerdict, ValidatorConfig,
};
use unistore_lib::ProductId;

use crate::ui;

/// Arguments of the `validate` subcommand.
pub struct ValidateArgs {
    pub url: String,
    pub receipt: String,
    pub product: String,
    pub encoding: String,
    pub bundle_id: String,
    pub user_id: String,
}

pub async fn run(args: ValidateArgs, verbose: bool) -> Result<()> {
    let encoding: ReceiptEncoding = args.encoding.parse()?;
    let config = ValidatorConfig::new(args.url)
        .with_encoding(encoding)
        .with_bundle_id(args.bundle_id)
        .with_user_id(args.user_id);
    let validator = HttpValidator::new(config)?;

    ui::header("Validating receipt");
    ui::key_value("endpoint", &validator.config().url);
    ui::key_value("product", &args.product);
    if verbose {
        ui::key_value("submitted", &validator.final_receipt(&args.receipt));
    }

    let spinner = ui::spinner("Contacting validation service...");
    let verdict = validator
        .validate(&args.receipt, &ProductId::new(args.product))
        .await;
    spinner.finish_and_clear();

    match verdict {
        ValidationVerdict::Accepted => {
            ui::success("Receipt accepted");
            Ok(())
        }
        ValidationVerdict::Rejected(reason) => {
            ui::error(&format!("Receipt rejected: {}", reason));
            anyhow::bail!("receipt rejected")
        }
    }
}
