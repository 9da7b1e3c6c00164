use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// Row-wise softmax, shifted by each row's maximum for numerical stability.
pub fn softmax(scores: ArrayView2<f32>) -> Array2<f32> {
    let mut probs = scores.to_owned();

    for mut row in probs.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &s| m.max(s));
        row.mapv_inplace(|s| (s - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|e| e / sum);
    }

    probs
}

/// `log(sum(exp(row)))` computed without overflowing.
pub fn log_sum_exp(row: ArrayView1<f32>) -> f32 {
    let max = row.fold(f32::NEG_INFINITY, |m, &s| m.max(s));
    max + row.iter().map(|&s| (s - max).exp()).sum::<f32>().ln()
}

/// Index of the largest score of each row. Ties go to the lowest index.
pub fn argmax_rows(scores: ArrayView2<f32>) -> Vec<usize> {
    scores
        .axis_iter(Axis(0))
        .map(|row| {
            let mut best = 0;
            for (i, &s) in row.iter().enumerate() {
                if s > row[best] {
                    best = i;
                }
            }
            best
        })
        .collect()
}
