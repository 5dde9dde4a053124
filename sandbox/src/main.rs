// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Deferload Sandbox
// A small host with a frame loop: requests units, renders placeholders until
// they settle, and loads one component only after a simulated click.
//
// Usage: sandbox [MODULE_DIR] [--config LOADER_RON]
// Without MODULE_DIR an in-memory demo source is used.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use deferload_core::module::Utf8Decoder;
use deferload_core::view::{present, FallbackBoundary};
use deferload_core::{DeferredUnit, ModuleSpecifier};
use deferload_io::{DirectorySource, MemorySource, ModuleSource};
use deferload_loader::{ConditionalTrigger, DeferredModuleLoader, LoaderConfig, TriggerSignal};
use tokio::runtime::Handle;

const FRAME: Duration = Duration::from_millis(16);
const MAX_FRAMES: u32 = 600;
const CLICK_AT_FRAME: u32 = 10;

struct Args {
    module_dir: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        module_dir: None,
        config: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().context("--config expects a path")?;
                args.config = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--") => bail!("Unknown flag '{flag}'"),
            dir if args.module_dir.is_none() => args.module_dir = Some(PathBuf::from(dir)),
            extra => bail!("Unexpected argument '{extra}'"),
        }
    }
    Ok(args)
}

fn demo_source() -> MemorySource {
    MemorySource::new()
        .with_module("components/Header", "html", "<Header/>")
        .with_module("components/Carousel", "html", "<Carousel/>")
        .with_export(
            "components/Carousel",
            "CarouselClient",
            "html",
            "<CarouselClient/>",
        )
        .with_module("components/Comments", "html", "<Comments/>")
        .with_latency("components/Carousel", Duration::from_millis(120))
        .with_latency("components/Comments", Duration::from_millis(60))
}

async fn open_source(args: &Args) -> Result<(Arc<dyn ModuleSource>, Vec<ModuleSpecifier>)> {
    match &args.module_dir {
        Some(dir) => {
            let source = DirectorySource::open(dir)
                .await
                .with_context(|| format!("Failed to open module directory '{}'", dir.display()))?;
            let mut modules: Vec<ModuleSpecifier> = source
                .index()
                .modules()
                .map(ModuleSpecifier::new)
                .collect();
            modules.sort_by(|a, b| a.module().cmp(b.module()));
            Ok((Arc::new(source), modules))
        }
        None => {
            let modules = vec![
                ModuleSpecifier::new("components/Header"),
                ModuleSpecifier::parse("components/Carousel#CarouselClient"),
                ModuleSpecifier::new("components/Missing"),
            ];
            Ok((Arc::new(demo_source()), modules))
        }
    }
}

fn render_frame(
    frame: u32,
    units: &[DeferredUnit<String>],
    boundary: &mut FallbackBoundary,
) -> Vec<String> {
    units
        .iter()
        .map(|unit| format!("[{frame:>3}] {:<40} {}", unit.identifier(), present(unit, boundary)))
        .collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    deferload_telemetry::logging::init("info");

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => LoaderConfig::load(path)?,
        None => LoaderConfig::default(),
    };

    let (source, modules) = open_source(&args).await?;
    let loader = DeferredModuleLoader::<String>::builder(Handle::current())
        .shared_source(source)
        .decoder("html", Utf8Decoder)
        .decoder("text", Utf8Decoder)
        .config(config)
        .build()?;

    let mut units = loader.request_all(modules);

    // "Comments" only loads once the user clicks; the click is simulated.
    let click = TriggerSignal::new();
    let mut comments = ConditionalTrigger::on_signal("components/Comments", &click);

    let mut boundary = FallbackBoundary::new("Loading...", "Failed to load component: {cause}");
    let mut ticker = tokio::time::interval(FRAME);

    for frame in 0..MAX_FRAMES {
        ticker.tick().await;

        if frame == CLICK_AT_FRAME {
            log::info!("Frame {frame}: user clicked 'Show comments'");
            click.fire();
        }
        if let Some(unit) = comments.poll(&loader) {
            if !units.iter().any(|u| u.ptr_eq(unit)) {
                units.push(unit.clone());
            }
        }

        let changed = loader.drain_events();
        if frame == 0 || !changed.is_empty() {
            for line in render_frame(frame, &units, &mut boundary) {
                println!("{line}");
            }
        }

        if !comments.is_armed() && units.iter().all(DeferredUnit::is_settled) {
            log::info!("All units settled after {} frame(s)", frame + 1);
            break;
        }
    }

    for metric in loader.metrics().get_namespace_metrics("loader") {
        log::info!("{} = {:?}", metric.id, metric.value);
    }

    Ok(())
}
