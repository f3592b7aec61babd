use super::OutputHandler;
use crate::error::Result;
use crate::metrics::registry::SENSORS;
use crate::metrics::values::ReconciledMetrics;
use async_trait::async_trait;
use indicatif::MultiProgress;
use std::sync::Arc;

pub struct ConsoleOutput {
    multi: Option<Arc<MultiProgress>>,
}

impl ConsoleOutput {
    pub fn new(multi: Option<Arc<MultiProgress>>) -> Self {
        Self { multi }
    }

    fn render(metrics: &ReconciledMetrics) -> Vec<String> {
        let mut lines = Vec::with_capacity(SENSORS.len());
        for sensor in SENSORS {
            let value = match metrics.get(sensor.id) {
                Some(value) => value.to_string(),
                None => "-".to_string(),
            };
            lines.push(format!("   {}: {}", sensor.name, value));
        }
        lines
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl OutputHandler for ConsoleOutput {
    async fn write(&mut self, metrics: &ReconciledMetrics) -> Result<()> {
        let lines = Self::render(metrics);
        if let Some(multi) = &self.multi {
            for line in lines {
                multi
                    .println(line)
                    .map_err(|e| crate::error::Error::Internal(e.to_string()))?;
            }
        } else {
            for line in lines {
                println!("{}", line);
            }
        }
        Ok(())
    }
}
