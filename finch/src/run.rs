use std::path::PathBuf;
use std::time::SystemTime;

use warbler::{err, error, Pipeline, Summary};
use warbler::error::{Chainable, Error, Result};
use warbler::storage::{DocumentSink, FsSink, FsSource};

use crate::discover::SiteDir;
use crate::flags;
use crate::util::millis;

pub const SITEMAP_FILE: &str = "sitemap.xml";

pub fn process(flags: &flags::Process) -> Result<Summary> {
    if let Some(jobs) = flags.jobs {
        warbler::rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .map_err(Error::from_std)?;
    }

    let start = SystemTime::now();
    let site = SiteDir::new(&flags.root, flags.config.as_deref())?;
    let ids = site.documents();
    println!("discovery time: {}ms ({} documents)", millis(start), ids.len());

    let pipeline = Pipeline::new(site.settings.site.clone())
        .dry_run(flags.dry_run)
        .max_failures(flags.max_failures);

    let source = FsSource::new(&site.root);
    let sink = FsSink::new(&site.root);
    let process = SystemTime::now();
    let summary = pipeline.run(&source, &sink, &ids);
    println!("process time: {}ms", millis(process));
    println!("total time: {}ms", millis(start));
    Ok(summary)
}

pub fn sitemap(flags: &flags::Sitemap) -> Result<PathBuf> {
    let start = SystemTime::now();
    let site = SiteDir::new(&flags.root, flags.config.as_deref())?;
    let pages = site.pages();
    println!("discovery time: {}ms ({} documents)", millis(start), pages.len());

    let xml = warbler::sitemap::render(&site.settings.site, pages.iter().map(|(id, t)| (id.as_str(), *t)));
    let output = flags.output.clone().unwrap_or_else(|| site.root.join(SITEMAP_FILE));
    let (Some(dir), Some(name)) = (output.parent(), output.file_name()) else {
        return err!("sitemap output must be a file path", "output" => output.display());
    };

    let written = FsSink::new(dir)
        .store(&name.to_string_lossy(), &xml)
        .chain_with(|| error!("failed to write sitemap", "output" => output.display()))?;

    if !written {
        log::info!("{}: already up to date", output.display());
    }

    println!("total time: {}ms", millis(start));
    Ok(output)
}
