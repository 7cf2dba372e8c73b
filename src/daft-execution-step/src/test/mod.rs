use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use common_error::{DaftError, DaftResult};
use parking_lot::Mutex;
use rand::{rngs::StdRng, SeedableRng};
use xxhash_rust::xxh3::{xxh3_64, xxh3_64_with_seed};

use crate::{
    instruction::{FileWrite, MapPartitionOp, TabularFilesScan},
    partition::{JoinType, Partition, PartitionExpr},
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MockExpr {
    Column(String),
    Literal(Value),
    Alias(Box<MockExpr>, String),
    Gt(Box<MockExpr>, Box<MockExpr>),
    NotNull(Box<MockExpr>),
    Sum(Box<MockExpr>),
    Count(Box<MockExpr>),
}

pub(crate) fn col(name: &str) -> MockExpr {
    MockExpr::Column(name.to_string())
}

pub(crate) fn lit(value: impl Into<Value>) -> MockExpr {
    MockExpr::Literal(value.into())
}

pub(crate) fn sum(expr: MockExpr) -> MockExpr {
    MockExpr::Sum(Box::new(expr))
}

pub(crate) fn count(expr: MockExpr) -> MockExpr {
    MockExpr::Count(Box::new(expr))
}

impl MockExpr {
    pub(crate) fn gt(self, other: Self) -> Self {
        Self::Gt(Box::new(self), Box::new(other))
    }

    pub(crate) fn alias(self, name: &str) -> Self {
        Self::Alias(Box::new(self), name.to_string())
    }

    pub(crate) fn name(&self) -> String {
        match self {
            Self::Column(name) | Self::Alias(_, name) => name.clone(),
            Self::Literal(_) => "literal".to_string(),
            Self::Gt(expr, _) | Self::NotNull(expr) | Self::Sum(expr) | Self::Count(expr) => {
                expr.name()
            }
        }
    }
}

impl PartitionExpr for MockExpr {
    fn to_column_expr(&self) -> Self {
        Self::Column(self.name())
    }

    fn not_null(&self) -> Self {
        Self::NotNull(Box::new(self.clone()))
    }
}

/// Row-oriented in-memory partition used to exercise instructions.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MockPartition {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    partition_id: Option<usize>,
}

pub(crate) fn mock_partition(columns: &[&str], rows: Vec<Vec<Value>>) -> MockPartition {
    MockPartition {
        columns: columns.iter().map(|c| (*c).to_string()).collect(),
        rows,
        partition_id: None,
    }
}

pub(crate) fn int_partition(name: &str, values: impl IntoIterator<Item = i64>) -> MockPartition {
    mock_partition(&[name], values.into_iter().map(|v| vec![v.into()]).collect())
}

impl MockPartition {
    pub(crate) fn with_partition_id(mut self, partition_id: usize) -> Self {
        self.partition_id = Some(partition_id);
        self
    }

    pub(crate) fn columns(&self) -> &[String] {
        &self.columns
    }

    pub(crate) fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub(crate) fn int_column(&self, name: &str) -> Vec<i64> {
        let idx = self.column_index(name).unwrap();
        self.rows
            .iter()
            .map(|row| match &row[idx] {
                Value::Int(v) => *v,
                other => panic!("expected int in column {name}, found {other:?}"),
            })
            .collect()
    }

    fn with_rows(&self, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
            partition_id: self.partition_id,
        }
    }

    fn column_index(&self, name: &str) -> DaftResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DaftError::ValueError(format!("Column {name} not found")))
    }

    fn eval(&self, expr: &MockExpr, row: &[Value]) -> DaftResult<Value> {
        match expr {
            MockExpr::Column(name) => Ok(row[self.column_index(name)?].clone()),
            MockExpr::Literal(value) => Ok(value.clone()),
            MockExpr::Alias(expr, _) => self.eval(expr, row),
            MockExpr::Gt(left, right) => match (self.eval(left, row)?, self.eval(right, row)?) {
                (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                (left, right) => Ok(Value::Bool(left > right)),
            },
            MockExpr::NotNull(expr) => Ok(Value::Bool(self.eval(expr, row)? != Value::Null)),
            MockExpr::Sum(_) | MockExpr::Count(_) => Err(DaftError::ValueError(format!(
                "Aggregation {expr:?} can only be evaluated by agg"
            ))),
        }
    }

    fn eval_row(&self, exprs: &[MockExpr], row: &[Value]) -> DaftResult<Vec<Value>> {
        exprs.iter().map(|e| self.eval(e, row)).collect()
    }

    fn eval_agg(&self, expr: &MockExpr, rows: &[usize]) -> DaftResult<Value> {
        match expr {
            MockExpr::Alias(expr, _) => self.eval_agg(expr, rows),
            MockExpr::Sum(inner) => {
                let mut total = None;
                for &idx in rows {
                    match self.eval(inner, &self.rows[idx])? {
                        Value::Int(v) => total = Some(total.unwrap_or(0) + v),
                        Value::Null => {}
                        other => {
                            return Err(DaftError::ValueError(format!("Cannot sum {other:?}")))
                        }
                    }
                }
                Ok(total.into())
            }
            MockExpr::Count(inner) => {
                let mut count = 0;
                for &idx in rows {
                    if self.eval(inner, &self.rows[idx])? != Value::Null {
                        count += 1;
                    }
                }
                Ok(Value::Int(count))
            }
            _ => Err(DaftError::ValueError(format!(
                "{expr:?} is not an aggregation"
            ))),
        }
    }
}

fn compare_keys(left: &[Value], right: &[Value], descending: &[bool]) -> Ordering {
    for ((l, r), desc) in left.iter().zip(right).zip(descending) {
        let ord = if *desc { r.cmp(l) } else { l.cmp(r) };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn hash_value(value: &Value, seed: Option<u64>) -> u64 {
    let bytes: Vec<u8> = match value {
        Value::Null => vec![],
        Value::Bool(b) => (if *b { b"1" } else { b"0" }).to_vec(),
        Value::Int(v) => v.to_le_bytes().to_vec(),
        Value::Str(s) => s.as_bytes().to_vec(),
    };
    match seed {
        Some(seed) => xxh3_64_with_seed(&bytes, seed),
        None => xxh3_64(&bytes),
    }
}

impl Partition for MockPartition {
    type Expr = MockExpr;

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn size_bytes(&self) -> DaftResult<Option<usize>> {
        Ok(Some(self.rows.len() * self.columns.len() * 8))
    }

    fn filter(&self, predicate: &[MockExpr]) -> DaftResult<Self> {
        let mut rows = vec![];
        for row in &self.rows {
            let keep = self
                .eval_row(predicate, row)?
                .iter()
                .all(|v| *v == Value::Bool(true));
            if keep {
                rows.push(row.clone());
            }
        }
        Ok(self.with_rows(rows))
    }

    fn eval_expression_list(&self, exprs: &[MockExpr]) -> DaftResult<Self> {
        let rows = self
            .rows
            .iter()
            .map(|row| self.eval_row(exprs, row))
            .collect::<DaftResult<Vec<_>>>()?;
        Ok(Self {
            columns: exprs.iter().map(MockExpr::name).collect(),
            rows,
            partition_id: self.partition_id,
        })
    }

    fn head(&self, num: usize) -> DaftResult<Self> {
        Ok(self.with_rows(self.rows.iter().take(num).cloned().collect()))
    }

    fn sample(&self, num: usize) -> DaftResult<Self> {
        if num >= self.len() {
            return Ok(self.clone());
        }
        let mut rng = StdRng::seed_from_u64(0);
        let mut indices = rand::seq::index::sample(&mut rng, self.len(), num).into_vec();
        indices.sort_unstable();
        Ok(self.with_rows(indices.into_iter().map(|i| self.rows[i].clone()).collect()))
    }

    fn agg(&self, to_agg: &[MockExpr], group_by: Option<&[MockExpr]>) -> DaftResult<Self> {
        let group_by = group_by.unwrap_or(&[]);
        let mut groups: BTreeMap<Vec<Value>, Vec<usize>> = BTreeMap::new();
        for (idx, row) in self.rows.iter().enumerate() {
            groups
                .entry(self.eval_row(group_by, row)?)
                .or_default()
                .push(idx);
        }
        if group_by.is_empty() && groups.is_empty() {
            groups.insert(vec![], vec![]);
        }
        let mut rows = vec![];
        for (mut key, members) in groups {
            for expr in to_agg {
                key.push(self.eval_agg(expr, &members)?);
            }
            rows.push(key);
        }
        Ok(Self {
            columns: group_by.iter().chain(to_agg).map(MockExpr::name).collect(),
            rows,
            partition_id: self.partition_id,
        })
    }

    fn join(
        &self,
        right: &Self,
        left_on: &[MockExpr],
        right_on: &[MockExpr],
        output_projection: &[MockExpr],
        how: JoinType,
    ) -> DaftResult<Self> {
        let mut columns = self.columns.clone();
        for c in &right.columns {
            if self.columns.contains(c) {
                columns.push(format!("right.{c}"));
            } else {
                columns.push(c.clone());
            }
        }
        let left_keys = self
            .rows
            .iter()
            .map(|row| self.eval_row(left_on, row))
            .collect::<DaftResult<Vec<_>>>()?;
        let right_keys = right
            .rows
            .iter()
            .map(|row| right.eval_row(right_on, row))
            .collect::<DaftResult<Vec<_>>>()?;
        let null_left = vec![Value::Null; self.columns.len()];
        let null_right = vec![Value::Null; right.columns.len()];
        let mut right_matched = vec![false; right.len()];
        let mut rows = vec![];
        for (lrow, lkey) in self.rows.iter().zip(&left_keys) {
            let mut matched = false;
            if !lkey.contains(&Value::Null) {
                for (ridx, (rrow, rkey)) in right.rows.iter().zip(&right_keys).enumerate() {
                    if lkey == rkey {
                        matched = true;
                        right_matched[ridx] = true;
                        rows.push(lrow.iter().chain(rrow).cloned().collect());
                    }
                }
            }
            if !matched && matches!(how, JoinType::Left | JoinType::Outer) {
                rows.push(lrow.iter().chain(&null_right).cloned().collect());
            }
        }
        if matches!(how, JoinType::Right | JoinType::Outer) {
            for (rrow, matched) in right.rows.iter().zip(right_matched) {
                if !matched {
                    rows.push(null_left.iter().chain(rrow).cloned().collect());
                }
            }
        }
        let joined = Self {
            columns,
            rows,
            partition_id: self.partition_id,
        };
        if output_projection.is_empty() {
            Ok(joined)
        } else {
            joined.eval_expression_list(output_projection)
        }
    }

    fn sort(&self, sort_by: &[MockExpr], descending: &[bool]) -> DaftResult<Self> {
        if sort_by.len() != descending.len() {
            return Err(DaftError::ValueError(format!(
                "Expected {} sort directions, got {}",
                sort_by.len(),
                descending.len()
            )));
        }
        let mut keyed = self
            .rows
            .iter()
            .map(|row| Ok((self.eval_row(sort_by, row)?, row.clone())))
            .collect::<DaftResult<Vec<_>>>()?;
        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, descending));
        Ok(self.with_rows(keyed.into_iter().map(|(_, row)| row).collect()))
    }

    fn quantiles(&self, num: usize) -> DaftResult<Self> {
        if self.is_empty() {
            return Ok(self.clone());
        }
        if num == 0 {
            return Ok(self.with_rows(vec![]));
        }
        let len = self.len();
        let indices = (1..num)
            .map(|i| ((i * len) / num).min(len - 1) as u64)
            .collect::<Vec<_>>();
        self.take(&indices)
    }

    fn merge_partitions(parts: &[&Self], verify_partition_id: bool) -> DaftResult<Self> {
        let Some(first) = parts.first() else {
            return Ok(mock_partition(&[], vec![]));
        };
        if verify_partition_id && parts.iter().any(|p| p.partition_id != first.partition_id) {
            return Err(DaftError::ValueError(
                "Cannot merge partitions with different partition ids".to_string(),
            ));
        }
        if let Some(bad) = parts.iter().find(|p| p.columns != first.columns) {
            return Err(DaftError::ValueError(format!(
                "Cannot merge partitions with columns {:?} and {:?}",
                first.columns, bad.columns
            )));
        }
        Ok(first.with_rows(parts.iter().flat_map(|p| p.rows.clone()).collect()))
    }

    fn hash_rows(&self, exprs: &[MockExpr]) -> DaftResult<Vec<u64>> {
        self.rows
            .iter()
            .map(|row| {
                let values = self.eval_row(exprs, row)?;
                Ok(values
                    .iter()
                    .fold(None, |seed, v| Some(hash_value(v, seed)))
                    .unwrap_or(0))
            })
            .collect()
    }

    fn search_sorted(
        &self,
        sort_by: &[MockExpr],
        boundaries: &Self,
        descending: &[bool],
    ) -> DaftResult<Vec<u64>> {
        if boundaries.columns.len() != sort_by.len() {
            return Err(DaftError::ValueError(format!(
                "Boundaries have {} columns but {} sort keys were given",
                boundaries.columns.len(),
                sort_by.len()
            )));
        }
        self.rows
            .iter()
            .map(|row| {
                let key = self.eval_row(sort_by, row)?;
                Ok(boundaries
                    .rows
                    .iter()
                    .filter(|b| compare_keys(b, &key, descending) == Ordering::Less)
                    .count() as u64)
            })
            .collect()
    }

    fn take(&self, indices: &[u64]) -> DaftResult<Self> {
        let rows = indices
            .iter()
            .map(|&idx| {
                self.rows.get(idx as usize).cloned().ok_or_else(|| {
                    DaftError::ComputeError(format!(
                        "Index {idx} out of bounds for partition of length {}",
                        self.len()
                    ))
                })
            })
            .collect::<DaftResult<Vec<_>>>()?;
        Ok(self.with_rows(rows))
    }
}

/// Map op that negates an integer column in place.
#[derive(Debug)]
pub(crate) struct NegateOp {
    pub column: String,
}

impl MapPartitionOp<MockPartition> for NegateOp {
    fn run(&self, input: &MockPartition) -> DaftResult<MockPartition> {
        let idx = input.column_index(&self.column)?;
        let rows = input
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                if let Value::Int(v) = row[idx] {
                    row[idx] = Value::Int(-v);
                }
                row
            })
            .collect();
        Ok(input.with_rows(rows))
    }

    fn name(&self) -> &str {
        "NegateOp"
    }
}

/// Scan over an in-memory "filesystem" of integer files, addressed by a `path` column.
#[derive(Debug, Default)]
pub(crate) struct MockFilesScan {
    pub files: HashMap<String, Vec<i64>>,
}

impl TabularFilesScan<MockPartition> for MockFilesScan {
    fn read(&self, filepaths: &MockPartition, partition_id: usize) -> DaftResult<MockPartition> {
        let idx = filepaths.column_index("path")?;
        let mut values = vec![];
        for row in &filepaths.rows {
            let Value::Str(path) = &row[idx] else {
                return Err(DaftError::ValueError(format!("Invalid path {:?}", row[idx])));
            };
            let file = self.files.get(path).ok_or_else(|| DaftError::FileNotFound {
                path: path.clone(),
                source: "no such file".into(),
            })?;
            values.extend(file.iter().copied());
        }
        Ok(int_partition("x", values).with_partition_id(partition_id))
    }
}

/// Writer that keeps written partitions in memory and reports one row per file.
#[derive(Debug, Default)]
pub(crate) struct MockFileWrite {
    pub written: Arc<Mutex<Vec<(String, MockPartition)>>>,
}

impl FileWrite<MockPartition> for MockFileWrite {
    fn write(&self, input: &MockPartition, partition_id: usize) -> DaftResult<MockPartition> {
        let path = format!("out/{partition_id}.parquet");
        self.written.lock().push((path.clone(), input.clone()));
        Ok(mock_partition(
            &["path", "num_rows"],
            vec![vec![path.as_str().into(), (input.len() as i64).into()]],
        ))
    }
}
