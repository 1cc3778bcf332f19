use snafu::prelude::*;

use crate::common::{dedupe_by_name, Collector, InputSnafu, Result};
use crate::targets::TargetSpec;

use super::{CustomerSheet, DuplicateName, DuplicateNames, EndpointFailure, RunReport, Uuid};

pub struct Inventory {
    config: super::Config,
    collector: Box<dyn Collector>,
}

impl Inventory {
    pub fn new(config: super::Config, collector: Box<dyn Collector>) -> Self {
        Self { config, collector }
    }

    /// Scan every endpoint for every selected customer and aggregate the
    /// results into one report.
    ///
    /// Selection problems are errors raised before any endpoint is
    /// contacted. A failing endpoint scan is recorded in the report and
    /// the batch carries on; the affected customer's table holds the rows
    /// from the endpoints that did succeed.
    pub fn run(
        &self,
        targets: &TargetSpec,
        customers: &[String],
        endpoints: &[String],
    ) -> Result<RunReport> {
        ensure!(
            !customers.is_empty(),
            InputSnafu {
                message: "No customers selected",
            }
        );
        ensure!(
            !endpoints.is_empty(),
            InputSnafu {
                message: "No endpoints given",
            }
        );
        for customer in customers {
            ensure!(
                targets.contains_key(customer),
                InputSnafu {
                    message: format!("Customer {customer:?} is not in the reference workbook"),
                }
            );
        }

        let mut report = RunReport {
            run_id: Uuid::new_v4(),
            sheets: Vec::with_capacity(customers.len()),
            failures: Vec::new(),
            duplicates: Vec::new(),
        };

        for customer in customers {
            let names = &targets[customer];
            let mut combined = Vec::new();

            for endpoint in endpoints {
                match self.collector.collect(endpoint, names) {
                    Ok(mut records) => combined.append(&mut records),
                    Err(err) => {
                        tracing::warn!(
                            endpoint = endpoint.as_str(),
                            customer = customer.as_str(),
                            error = err.to_string(),
                            "Endpoint scan failed",
                        );
                        report.failures.push(EndpointFailure {
                            endpoint: endpoint.clone(),
                            customer: customer.clone(),
                            reason: err.to_string(),
                        });
                    }
                }
            }

            let result = dedupe_by_name(combined);
            if self.config.duplicate_names == DuplicateNames::Flag {
                for dropped in result.dropped {
                    tracing::warn!(
                        customer = customer.as_str(),
                        name = dropped.name.as_str(),
                        endpoint = dropped.vcenter.as_str(),
                        "Duplicate VM name dropped",
                    );
                    report.duplicates.push(DuplicateName {
                        customer: customer.clone(),
                        name: dropped.name,
                        vcenter: dropped.vcenter,
                    });
                }
            }

            report.sheets.push(CustomerSheet {
                customer: customer.clone(),
                records: result.kept,
            });
        }

        tracing::info!(
            run_id = report.run_id.to_string(),
            customers = report.sheets.len(),
            records = report.records(),
            failures = report.failures.len(),
            "Inventory collected",
        );

        Ok(report)
    }
}
