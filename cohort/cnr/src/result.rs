//! 队列分析结果.

use lc_berry::consts::DEFAULT_CONTRASTS;
use lc_berry::stats::SubjectCnr;
use lc_berry::{RoiError, RoiResult};
use std::io::{self, Write};

/// 将对比度 `contrast` 下所有受试者的结果写进 `w` 中.
fn describe_into<W: Write>(contrast: &str, records: &[&SubjectCnr], w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Contrast `{contrast}`:")?;
    writeln!(w, "{S4}Subjects: {}", records.len())?;
    if records.is_empty() {
        return Ok(());
    }

    let n = records.len() as f64;
    let mean = records.iter().map(|r| r.cnr.cnr).sum::<f64>() / n;
    let std = (records
        .iter()
        .map(|r| (r.cnr.cnr - mean).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();
    let min = records.iter().map(|r| r.cnr.cnr).fold(f64::INFINITY, f64::min);
    let max = records
        .iter()
        .map(|r| r.cnr.cnr)
        .fold(f64::NEG_INFINITY, f64::max);
    writeln!(w, "{S4}CNR: {mean:.4} ± {std:.4} (range {min:.4} .. {max:.4})")?;

    let ratios: Vec<f64> = records
        .iter()
        .map(|r| r.cnr.contrast_ratio)
        .filter(|v| v.is_finite())
        .collect();
    if ratios.is_empty() {
        write!(w, "{S4}Contrast ratio: /")?;
    } else {
        let m = ratios.iter().sum::<f64>() / ratios.len() as f64;
        write!(w, "{S4}Contrast ratio: {:.2}%", m * 100.0)?;
    }
    Ok(())
}

/// 队列 CNR 分析最终结果.
#[derive(Default)]
pub struct CohortResult {
    records: Vec<SubjectCnr>,
    failures: Vec<(String, RoiError)>,
}

impl CohortResult {
    /// 收集每个受试者的结果, 成功与失败分开保存.
    pub fn from_outcomes<I>(it: I) -> Self
    where
        I: IntoIterator<Item = (String, RoiResult<Vec<SubjectCnr>>)>,
    {
        let mut ans = Self::default();
        for (subject, r) in it {
            match r {
                Ok(v) => ans.records.extend(v),
                Err(e) => ans.failures.push((subject, e)),
            }
        }
        ans
    }

    /// 分析运行结果.
    pub fn analyze(&self) -> io::Result<()> {
        utils::sep();
        let mut buf = Vec::with_capacity(512);

        for contrast in DEFAULT_CONTRASTS {
            let records: Vec<_> = self
                .records
                .iter()
                .filter(|r| r.contrast == contrast)
                .collect();
            describe_into(contrast, &records, &mut buf)?;
            println!("{}", String::from_utf8_lossy(&buf));
            buf.clear();

            utils::sep();
        }

        println!("Failures: {}", self.failures.len());
        for (subject, e) in self.failures.iter() {
            println!("    {subject}: {e}");
        }
        utils::sep();
        Ok(())
    }
}
