//! Splitting independent work units across separate job invocations
use std::fmt::Display;
use std::str::FromStr;

use crate::error::ShardError;

/// One job's share of a list of independent work units.
///
/// Unit `i` (0-based) belongs to job `j` (1-based) of `J` iff `i mod J == j - 1`. Jobs
/// share no state, so their outputs can simply be concatenated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JobShard {
    job_id: usize,
    job_count: usize,
}

impl Default for JobShard {
    fn default() -> Self {
        Self {
            job_id: 1,
            job_count: 1,
        }
    }
}

impl JobShard {
    pub fn new(job_id: usize, job_count: usize) -> Result<Self, ShardError> {
        if job_count == 0 {
            return Err(ShardError::NoJobs);
        }
        if job_id == 0 || job_id > job_count {
            return Err(ShardError::JobOutOfRange { job_id, job_count });
        }
        Ok(Self { job_id, job_count })
    }

    pub fn job_id(&self) -> usize {
        self.job_id
    }

    pub fn job_count(&self) -> usize {
        self.job_count
    }

    #[inline]
    pub fn owns(&self, index: usize) -> bool {
        index % self.job_count == self.job_id - 1
    }

    /// Keep only the units of `units` this job owns, preserving order
    pub fn select<I: IntoIterator>(&self, units: I) -> impl Iterator<Item = I::Item> {
        let shard = *self;
        units
            .into_iter()
            .enumerate()
            .filter(move |(i, _)| shard.owns(*i))
            .map(|(_, u)| u)
    }
}

impl Display for JobShard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.job_id, self.job_count)
    }
}

impl FromStr for JobShard {
    type Err = ShardError;

    /// Parse `JOB/COUNT`, e.g. `2/3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (job, count) = s
            .split_once('/')
            .ok_or_else(|| ShardError::Malformed(s.to_string()))?;
        let job_id = job
            .trim()
            .parse()
            .map_err(|_| ShardError::Malformed(s.to_string()))?;
        let job_count = count
            .trim()
            .parse()
            .map_err(|_| ShardError::Malformed(s.to_string()))?;
        Self::new(job_id, job_count)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_select() {
        let shard = JobShard::new(2, 3).unwrap();
        let picked: Vec<usize> = shard.select(0..10).collect();
        assert_eq!(picked, vec![1, 4, 7]);
    }

    #[test]
    fn test_partition_is_exact() {
        let count = 4;
        let mut seen = vec![0; 23];
        for job in 1..=count {
            let shard = JobShard::new(job, count).unwrap();
            for i in shard.select(0..23) {
                seen[i] += 1;
            }
        }
        assert!(seen.iter().all(|n| *n == 1));
    }

    #[test]
    fn test_parse() {
        assert_eq!("2/3".parse::<JobShard>(), JobShard::new(2, 3));
        assert_eq!("1/1".parse::<JobShard>().unwrap(), JobShard::default());
        assert_eq!(
            "4/3".parse::<JobShard>(),
            Err(ShardError::JobOutOfRange {
                job_id: 4,
                job_count: 3
            })
        );
        assert_eq!(
            "0/3".parse::<JobShard>().unwrap_err().to_string(),
            "Job id 0 is outside of 1..=3"
        );
        assert_eq!("1/0".parse::<JobShard>(), Err(ShardError::NoJobs));
        assert!(matches!("two".parse::<JobShard>(), Err(ShardError::Malformed(_))));
    }
}
