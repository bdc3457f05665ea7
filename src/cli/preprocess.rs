//! `hotspec preprocess`: ask a running broker for a compiled file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tokio::sync::mpsc;

use super::PreprocessArgs;
use crate::config::HotspecConfig;
use crate::requester::{PreprocessError, PreprocessFile, Requester};
use crate::utils::path::{decode_file_path, encode_file_path};

/// Print the compiled file's path; with `--watch`, again after every rerun.
pub async fn preprocess(config: &HotspecConfig, args: &PreprocessArgs) -> Result<()> {
    let entry = decode_file_path(&args.file)
        .map_err(|_| PreprocessError::InvalidPath(args.file.clone()))?;
    let entry = std::path::absolute(&entry)?;
    let output = output_path(&entry, args.output.as_deref())?;

    let requester = Requester::connect(config)
        .await
        .context("cannot reach the broker, is `hotspec serve` running?")?;
    let file_path = encode_file_path(&entry);

    if !args.watch {
        let compiled = requester
            .preprocess(PreprocessFile::new(&file_path, &output))
            .await?;
        println!("{}", compiled.display());
        return Ok(());
    }

    loop {
        // A fresh channel per request; the broker closing ends the loop
        let (rerun_tx, mut rerun_rx) = mpsc::unbounded_channel();
        let file = PreprocessFile::new(&file_path, &output).watch(rerun_tx);

        match requester.preprocess(file).await {
            Ok(compiled) => println!("{}", compiled.display()),
            Err(PreprocessError::Compile(message)) => crate::log!("error"; "{}", message),
            Err(e) => return Err(e.into()),
        }

        if rerun_rx.recv().await.is_none() {
            crate::log!("preprocess"; "broker connection closed");
            return Ok(());
        }
        crate::debug!("rerun"; "{}", entry.display());
    }
}

/// `--output`, or the entry's file name under the system temp dir.
fn output_path(entry: &Path, output: Option<&Path>) -> Result<PathBuf> {
    if let Some(output) = output {
        return Ok(std::path::absolute(output)?);
    }
    let name = entry
        .file_name()
        .ok_or_else(|| anyhow!("`{}` has no file name", entry.display()))?;
    Ok(std::env::temp_dir().join(name))
}
