// Copyright (C) 2024 Ethan Uppal.
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3 of the License only.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{env, sync::mpsc, thread::available_parallelism};

use arith_verify_harness::prelude::*;
use arith_verify_verilator::{VerilatedAdapter, VerilatedAdapterOptions};
use argh::FromArgs;
use camino::Utf8PathBuf;
use config::{LibraryConfig, Overrides, Settings};
use indicatif::ProgressBar;
use owo_colors::OwoColorize;
use snafu::{Report, ResultExt, Whatever, whatever};
use threadpool::ThreadPool;

mod config;

/// Check arithmetic circuits against their golden models
#[derive(FromArgs)]
struct ArithRunnerCommand {
    /// data width N of the multi-bit circuits (default 8)
    #[argh(option, short = 'w')]
    width: Option<u32>,

    /// number of random vectors per circuit (default 100)
    #[argh(option, short = 'n')]
    count: Option<usize>,

    /// seed for random vectors; drawn from entropy and reported when omitted
    #[argh(option)]
    seed: Option<u64>,

    /// vector mode to run: exhaustive, targeted or random (repeatable)
    #[argh(option, short = 'm')]
    mode: Vec<VectorMode>,

    /// circuit to check: full_adder, ripple_carry_adder or barrel_shifter
    /// (repeatable, default all)
    #[argh(option, short = 'c')]
    circuit: Vec<CircuitKind>,

    /// keep checking past the first mismatch
    #[argh(switch)]
    collect_all: bool,

    /// TOML file with a [harness] table and [circuits.<name>] libraries
    #[argh(option)]
    config: Option<Utf8PathBuf>,

    /// number of circuits checked at once (default: available parallelism)
    #[argh(option, short = 'j')]
    jobs: Option<usize>,
}

/// One vector sequence against one circuit.
struct Job {
    spec: CircuitSpec,
    sequence: VectorSequence,
    library: Option<LibraryConfig>,
    options: RunOptions,
}

impl Job {
    fn title(&self) -> String {
        let mode = self.sequence.mode();
        match self.sequence.seed() {
            Some(seed) => format!("{} {mode} seed={seed}", self.spec),
            None => format!("{} {mode}", self.spec),
        }
    }

    fn adapter(&self) -> Result<Box<dyn DutAdapter>, Whatever> {
        let adapter: Box<dyn DutAdapter> = match &self.library {
            Some(LibraryConfig { library, top }) => Box::new(
                VerilatedAdapter::load(
                    library,
                    top,
                    &self.spec.ports(),
                    VerilatedAdapterOptions {
                        log: self.options.log,
                    },
                )
                .whatever_context(format!(
                    "Failed to load {top} from {library}"
                ))?,
            ),
            None => behavioral::for_kind(self.spec.kind(), self.spec.width()),
        };
        Ok(adapter)
    }

    fn run(self, bar: &ProgressBar) -> Result<usize, Whatever> {
        let adapter = self.adapter()?;
        let mut run = Run::new(&self.spec, adapter, self.options)
            .whatever_context("Adapter rejected")?;
        if let Err(error) = run.execute(bar.wrap_iter(self.sequence)) {
            whatever!("{}", Report::from_error(error));
        }
        Ok(run.verdicts().len())
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

#[snafu::report]
fn main() -> Result<(), Whatever> {
    let command: ArithRunnerCommand = argh::from_env();

    let log = env::var("RUST_LOG").is_ok();
    if log {
        env_logger::init();
    }

    let settings = Settings::load(
        command.config.as_deref(),
        Overrides {
            width: command.width,
            count: command.count,
            seed: command.seed,
            modes: command.mode,
            circuits: command.circuit,
            collect_all: command.collect_all,
        },
    )?;
    if log {
        log::info!("Loaded settings {settings:?}");
    }

    let options = RunOptions {
        policy: if settings.collect_all {
            MismatchPolicy::CollectAll
        } else {
            MismatchPolicy::FailFast
        },
        log,
    };

    let mut jobs = vec![];
    for &kind in &settings.circuits {
        let spec = kind.spec(settings.width);
        for mode in settings.modes_for(kind) {
            let sequence = vectors::generate(&spec, mode, &settings.context)
                .whatever_context(format!(
                    "Cannot generate {mode} vectors for {spec}"
                ))?;
            jobs.push(Job {
                spec: spec.clone(),
                sequence,
                library: settings.libraries.get(&kind).cloned(),
                options,
            });
        }
    }

    let job_count = jobs.len();
    let vector_count = jobs.iter().map(|job| job.sequence.len()).sum::<usize>();
    let worker_count = command
        .jobs
        .or_else(|| available_parallelism().ok().map(|value| value.get()))
        .unwrap_or(1)
        .clamp(1, job_count.max(1));

    println!(
        "{} {} run{} ({} vector{}, N={}) across {} thread{}",
        "     STARTING".bold().bright_cyan(),
        job_count,
        plural(job_count),
        vector_count,
        plural(vector_count),
        settings.width,
        worker_count,
        plural(worker_count),
    );

    let bar = ProgressBar::new(vector_count as u64);
    let pool = ThreadPool::new(worker_count);
    let (tx, rx) = mpsc::channel();

    for job in jobs {
        let tx = tx.clone();
        let bar = bar.clone();
        pool.execute(move || {
            let title = job.title();
            let result = match job.run(&bar) {
                Ok(checked) => Ok(format!(
                    "         {} [{}] {} vector{}",
                    "PASS".bold().bright_green(),
                    title,
                    checked,
                    plural(checked)
                )),
                Err(error) => Err(format!(
                    "         {} [{}]\n{}",
                    "FAIL".bold().bright_red(),
                    title,
                    error
                )),
            };
            let _ = tx.send(result);
        });
    }
    drop(tx);

    let mut failures = 0;
    for _ in 0..job_count {
        match rx.recv() {
            Ok(Ok(success)) => bar.println(success),
            Ok(Err(failure)) => {
                failures += 1;
                bar.println(failure);
            }
            Err(error) => {
                failures += 1;
                bar.println(format!(
                    "       {} [<unknown run>]: {}",
                    "CLOSED".bold().on_bright_yellow(),
                    error
                ));
                break;
            }
        }
    }
    bar.finish_and_clear();

    println!(
        "{} with {} failure{}",
        "     FINISHED".bold().bright_cyan(),
        failures,
        plural(failures),
    );

    if failures > 0 {
        whatever!("Exiting due to failure(s)");
    }

    Ok(())
}
