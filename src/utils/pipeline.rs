use crate::cache::MemoStore;
use crate::core::parser::{Extraction, UniversalParser};
use crate::llm::TextGenerator;
use crate::prompts;
use crate::{render_markdown, RenderOptions};
use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const BRD_CHAIN: &str = "brd";
const TEST_SCENARIO_CHAIN: &str = "test_scenarios";

/// Result of one generation run.
#[derive(Debug, Clone)]
pub struct GeneratedBrd {
    pub run_id: Uuid,
    /// Final markdown, test scenarios spliced in.
    pub markdown: String,
    pub docx: Vec<u8>,
    /// Inputs that were skipped, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

/// Extract, prompt, splice, render.
pub struct BrdPipeline<G: TextGenerator> {
    parser: UniversalParser,
    generator: G,
    options: RenderOptions,
    logo: Option<Vec<u8>>,
}

impl<G: TextGenerator> BrdPipeline<G> {
    pub fn new(generator: G, options: RenderOptions) -> Self {
        Self {
            parser: UniversalParser::new(),
            generator,
            options,
            logo: None,
        }
    }

    pub fn with_logo(mut self, png: Vec<u8>) -> Self {
        self.logo = Some(png);
        self
    }

    /// Read `inputs`, skipping unreadable ones, and run the whole chain.
    pub fn run_files<P: AsRef<Path>>(&self, memo: &mut MemoStore, inputs: &[P]) -> Result<GeneratedBrd> {
        let extraction = self.extract(inputs);
        self.run(memo, extraction)
    }

    pub fn extract<P: AsRef<Path>>(&self, inputs: &[P]) -> Extraction {
        let extraction = self.parser.extract_all(inputs);
        for (path, reason) in &extraction.failures {
            warn!("Input {} omitted: {}", path.display(), reason);
        }
        extraction
    }

    pub fn run(&self, memo: &mut MemoStore, extraction: Extraction) -> Result<GeneratedBrd> {
        let run_id = Uuid::new_v4();
        info!("Run {run_id}: generating BRD with {}", self.generator.model());

        let markdown = self.generate_markdown(memo, &extraction)?;
        let docx = self.render(&markdown, &extraction)?;

        let (hits, misses) = memo.stats();
        info!("Run {run_id}: done ({} bytes, memo {hits} hits / {misses} misses)", docx.len());
        Ok(GeneratedBrd {
            run_id,
            markdown,
            docx,
            failures: extraction.failures,
        })
    }

    /// Both LLM chains, memoized, with the scenarios spliced under 7.0.
    pub fn generate_markdown(&self, memo: &mut MemoStore, extraction: &Extraction) -> Result<String> {
        if extraction.is_empty() {
            bail!("no requirement text could be extracted from the inputs");
        }

        let brd_prompt = prompts::brd_prompt(&extraction.requirements, &extraction.tables_text);
        let brd = self
            .call(memo, BRD_CHAIN, &brd_prompt)
            .context("BRD generation failed")?;

        let scenario_prompt = prompts::test_scenarios_prompt(&brd);
        let scenarios = self
            .call(memo, TEST_SCENARIO_CHAIN, &scenario_prompt)
            .context("test scenario generation failed")?;

        Ok(prompts::splice_test_scenarios(&brd, &scenarios))
    }

    /// Lay out `markdown` as `.docx`. Tables extracted from the inputs back
    /// any `[[TABLE_ID:...]]` markers the model kept.
    pub fn render(&self, markdown: &str, extraction: &Extraction) -> Result<Vec<u8>> {
        render_markdown(markdown, &self.options, &extraction.tables, self.logo.clone())
            .map_err(|e| {
                error!("Document serialization failed: {e}");
                anyhow::Error::new(e)
            })
            .context("could not build the Word document; the generated markdown can still be copied manually")
    }

    fn call(&self, memo: &mut MemoStore, chain: &str, prompt: &str) -> crate::Result<String> {
        memo.get_or_try_insert_with(&[chain, self.generator.model(), prompt], || {
            info!("Calling {} for chain '{chain}'", self.generator.model());
            self.generator.generate(prompt)
        })
    }
}
