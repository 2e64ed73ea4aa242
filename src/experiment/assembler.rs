// src/experiment/assembler.rs
//! Train/test matrix assembly for one split
//!
//! Rows of every recording on a side are stacked in split order, so input
//! row `i` and output row `i` always come from the same window. Columns
//! follow the caller's feature and channel order, never alphabetical order.

use super::split::Split;
use crate::error::{ForceError, ForceResult, SplitSide};
use crate::processing::windowing::{column_name, FeatureTable};
use crate::recording::RecordingIdentity;
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use std::collections::BTreeMap;

/// Loaded feature tables of one subject, keyed by recording
pub type FeatureTables = BTreeMap<RecordingIdentity, FeatureTable>;

/// Aligned input/output matrices of one side of a split
#[derive(Debug, Clone, PartialEq)]
pub struct DataSide {
    pub input: Array2<f64>,
    pub output: Array2<f64>,
    pub input_columns: Vec<String>,
    pub output_columns: Vec<String>,
}

impl DataSide {
    pub fn n_rows(&self) -> usize {
        self.input.nrows()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledData {
    pub train: DataSide,
    pub test: DataSide,
}

/// Build train and test matrices for `split`
pub fn assemble(
    tables: &FeatureTables,
    split: &Split,
    feature_names: &[String],
    force_feature_name: &str,
    trajectory_channels: &[usize],
) -> ForceResult<AssembledData> {
    let train = assemble_side(
        tables,
        &split.train,
        SplitSide::Train,
        split.index,
        feature_names,
        force_feature_name,
        trajectory_channels,
    )?;
    let test = assemble_side(
        tables,
        &split.test,
        SplitSide::Test,
        split.index,
        feature_names,
        force_feature_name,
        trajectory_channels,
    )?;

    if train.input_columns != test.input_columns {
        return Err(ForceError::shape_mismatch(
            &format!("split {} test input columns", split.index),
            train.input_columns.join(","),
            test.input_columns.join(","),
        ));
    }
    Ok(AssembledData { train, test })
}

fn assemble_side(
    tables: &FeatureTables,
    records: &[RecordingIdentity],
    side: SplitSide,
    split_index: usize,
    feature_names: &[String],
    force_feature_name: &str,
    trajectory_channels: &[usize],
) -> ForceResult<DataSide> {
    let empty = || ForceError::EmptySplit {
        side,
        split: split_index,
    };
    if records.is_empty() {
        return Err(empty());
    }

    let mut input_columns: Option<Vec<String>> = None;
    let mut output_columns = Vec::new();
    let mut inputs = Vec::with_capacity(records.len());
    let mut outputs = Vec::with_capacity(records.len());

    for record in records {
        let table = tables.get(record).ok_or_else(|| {
            ForceError::invalid_data("assembly", format!("no feature table loaded for {}", record))
        })?;

        let input_indices = input_indices(table, record, feature_names)?;
        let names: Vec<String> = input_indices
            .iter()
            .map(|&i| table.columns()[i].clone())
            .collect();
        match &input_columns {
            None => input_columns = Some(names),
            Some(expected) if *expected != names => {
                return Err(ForceError::shape_mismatch(
                    &format!("input columns of {}", record),
                    expected.join(","),
                    names.join(","),
                ));
            }
            Some(_) => {}
        }

        let mut output_indices = Vec::with_capacity(trajectory_channels.len());
        output_columns.clear();
        for &channel in trajectory_channels {
            let name = column_name(force_feature_name, channel);
            let index = table.column_index(&name).ok_or_else(|| ForceError::MissingColumn {
                column: name.clone(),
                recording: record.to_string(),
            })?;
            output_indices.push(index);
            output_columns.push(name);
        }

        inputs.push(table.data().select(Axis(1), &input_indices));
        outputs.push(table.data().select(Axis(1), &output_indices));
    }

    let rows: usize = inputs.iter().map(|m| m.nrows()).sum();
    if rows == 0 {
        return Err(empty());
    }

    Ok(DataSide {
        input: stack_rows(&inputs)?,
        output: stack_rows(&outputs)?,
        input_columns: input_columns.unwrap_or_default(),
        output_columns,
    })
}

/// Input column indices: every column of each base name, caller order first
fn input_indices(
    table: &FeatureTable,
    record: &RecordingIdentity,
    feature_names: &[String],
) -> ForceResult<Vec<usize>> {
    let mut indices = Vec::new();
    for feature in feature_names {
        let columns = table.columns_with_base(feature);
        if columns.is_empty() {
            return Err(ForceError::MissingColumn {
                column: format!("{}_*", feature),
                recording: record.to_string(),
            });
        }
        indices.extend(columns);
    }
    Ok(indices)
}

fn stack_rows(blocks: &[Array2<f64>]) -> ForceResult<Array2<f64>> {
    let views: Vec<ArrayView2<f64>> = blocks.iter().map(|b| b.view()).collect();
    concatenate(Axis(0), &views).map_err(|e| ForceError::invalid_data("assembly", e.to_string()))
}
