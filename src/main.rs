// main.rs
mod logging;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use ndarray::{Array2, ArrayView2, Axis};

use cfg_task::task::{Code, EncodedBatch, Grammar, SequenceModel, argmax};
use cfg_task::{CfgTask, Result, Task, TaskConfig};

/// Generate next-word prediction data from a context-free grammar and score a
/// bigram baseline on it.
#[derive(Parser, Debug)]
struct Args {
    /// Grammar file, one `LHS -> alt | alt` rule per line.
    grammar: PathBuf,

    /// JSON task config; unset fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Words to score, overriding the config.
    #[arg(long, value_delimiter = ',')]
    predict: Vec<String>,

    /// Directory the vocabulary and datasets are written to.
    #[arg(long, default_value = "cfg_output")]
    output_dir: PathBuf,

    /// Also write the encoded datasets as JSON.
    #[arg(long)]
    dump_data: bool,

    #[command(flatten)]
    logging: logging::LogArgs,
}

/// Scores the next word by how often it followed the current word in the
/// training data.
struct BigramModel {
    scores: Array2<f32>,
}

impl BigramModel {
    fn fit(data: &EncodedBatch) -> Self {
        let vocab = data.vocab_size();
        let mut counts = Array2::<f32>::zeros((vocab, vocab));
        for (inputs, targets) in data.inputs.outer_iter().zip(data.targets.outer_iter()) {
            for (word, &next) in inputs.outer_iter().zip(targets.iter()) {
                counts[[argmax(word), next]] += 1.0;
            }
        }
        Self {
            scores: counts.mapv(|c| (c + 1.0).ln()),
        }
    }
}

impl SequenceModel for BigramModel {
    fn reset(&mut self, _batch_size: usize) {}

    fn step(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut out = Array2::zeros((inputs.nrows(), self.scores.ncols()));
        for (mut row, word) in out.outer_iter_mut().zip(inputs.outer_iter()) {
            row.assign(&self.scores.index_axis(Axis(0), argmax(word)));
        }
        out
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Err(e) = args.logging.setup_logging(3) {
        eprintln!("failed to initialize logging: {e}");
    }

    let grammar = Grammar::parse(&fs::read_to_string(&args.grammar)?)?;
    let mut config = match &args.config {
        Some(path) => TaskConfig::from_json_file(path)?,
        None => TaskConfig::default(),
    };
    if !args.predict.is_empty() {
        config.to_predict = args.predict.clone();
    }

    let mut task = CfgTask::new(grammar, config)?;
    let data = task.get_data()?;

    let mut model = BigramModel::fit(&data.train);
    for (name, split) in [("train", &data.train), ("test", &data.test)] {
        let result = task.evaluate(&mut model, split)?;
        log::info!(
            "{name}: loss {:.4}, accuracy {:.4} ({}/{})",
            result.loss,
            result.accuracy(),
            result.correct,
            result.total
        );
    }

    fs::create_dir_all(&args.output_dir)?;
    write_json(&args.output_dir.join("vocab.json"), task.encoder())?;
    if args.dump_data {
        write_json(&args.output_dir.join("dataset.json"), &data)?;
    }

    let predicted: Vec<&str> = task
        .predictable_codes()
        .iter()
        .filter_map(|&code: &Code| task.encoder().word_for(code))
        .collect();
    log::info!(
        "wrote artifacts to {:?}; scored words: {:?}",
        args.output_dir,
        predicted
    );
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &std::path::Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
