/// Running count / mean / squared-deviation sum (Welford), with removal.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moment {
    pub n: usize,
    pub mean: f64,
    pub m2: f64,
}

impl Moment {
    #[inline(always)]
    pub fn add(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    #[inline(always)]
    pub fn remove(&mut self, x: f64) {
        match self.n {
            0 => {}
            1 => *self = Moment::default(),
            n => {
                let prev_mean = (n as f64 * self.mean - x) / (n - 1) as f64;
                self.m2 -= (x - prev_mean) * (x - self.mean);
                self.m2 = self.m2.max(0.0);
                self.mean = prev_mean;
                self.n = n - 1;
            }
        }
    }

    pub fn mean(&self) -> Option<f64> {
        (self.n > 0).then_some(self.mean)
    }

    /// Population variance (divides by n).
    pub fn population_variance(&self) -> Option<f64> {
        (self.n > 0).then(|| self.m2 / self.n as f64)
    }

    /// Sample variance (divides by n - 1). A single value has variance 0.
    pub fn sample_variance(&self) -> Option<f64> {
        match self.n {
            0 => None,
            1 => Some(0.0),
            n => Some(self.m2 / (n - 1) as f64),
        }
    }
}

/// Per (parameter, group) moments, parameter-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMoments {
    groups: usize,
    cells: Vec<Moment>,
}

impl GroupMoments {
    pub fn build(values: &[Vec<Option<f64>>], labels: &[usize], groups: usize) -> Self {
        let mut cells = vec![Moment::default(); values.len() * groups];
        for (p, column) in values.iter().enumerate() {
            for (subject, &g) in labels.iter().enumerate() {
                if let Some(x) = column[subject] {
                    cells[p * groups + g].add(x);
                }
            }
        }
        Self { groups, cells }
    }

    pub fn groups(&self) -> usize {
        self.groups
    }

    pub fn param(&self, p: usize) -> &[Moment] {
        &self.cells[p * self.groups..(p + 1) * self.groups]
    }

    /// Moves one subject's values from group `from` to group `to`.
    #[inline(always)]
    pub fn relabel(&mut self, values: &[Vec<Option<f64>>], subject: usize, from: usize, to: usize) {
        if from == to {
            return;
        }
        for (p, column) in values.iter().enumerate() {
            if let Some(x) = column[subject] {
                self.cells[p * self.groups + from].remove(x);
                self.cells[p * self.groups + to].add(x);
            }
        }
    }
}
