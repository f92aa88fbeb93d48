use std::io::Write;

// Minimal single-line progress bar for the render loop. Write errors are
// deliberately ignored; progress output is best effort.
pub struct Progress<W: Write> {
    total_work: u64,
    current_progress: u64,
    output: W,
    bar_length: u32,
    last_update_percentage: f64,
}

const UPDATE_DELTA: f64 = 0.009;

const PROGRESS_PREFIX: &str = "\rProgress: <";
const FILLED_CHAR: char = '#';
const EMPTY_CHAR: char = ' ';

impl<W: Write> Progress<W> {
    pub fn new(total_work: u64, output: W, bar_length: u32) -> Progress<W> {
        Progress {
            total_work: total_work,
            current_progress: 0,
            output: output,
            bar_length: bar_length,
            last_update_percentage: 0.0,
        }
    }

    pub fn update(&mut self, progress_made: u64) {
        self.current_progress =
            std::cmp::min(self.current_progress + progress_made, self.total_work);
        let new_percentage = self.current_progress as f64 / self.total_work as f64;
        if (new_percentage - self.last_update_percentage).abs() > UPDATE_DELTA {
            self.print_progress(new_percentage);
        }
    }

    pub fn done(&mut self) {
        self.print_progress(1.0);
        let _ = self.output.write("\n".as_bytes());
        let _ = self.output.flush();
    }

    fn print_progress(&mut self, percentage: f64) {
        self.last_update_percentage = percentage;

        let num_filled = (percentage * self.bar_length as f64).round() as u32;
        let mut bar = String::with_capacity(PROGRESS_PREFIX.len() + self.bar_length as usize + 8);
        bar.push_str(PROGRESS_PREFIX);
        for _ in 0..num_filled {
            bar.push(FILLED_CHAR);
        }
        for _ in 0..(self.bar_length - num_filled) {
            bar.push(EMPTY_CHAR);
        }
        bar.push_str(format!("> ({}%)", (percentage * 100.0).round() as u32).as_str());

        let _ = self.output.write(bar.as_bytes());
        let _ = self.output.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_completion() {
        let mut sink = Vec::new();
        {
            let mut progress = Progress::new(10, &mut sink, 20);
            progress.update(5);
            progress.update(5);
            progress.done();
        }
        let printed = String::from_utf8(sink).unwrap();
        assert!(printed.contains("(100%)"));
    }
}
