/// Most frequent non-empty answer; ties go to the answer seen first.
/// Empty when there is no non-empty answer.
pub fn majority_vote<S: AsRef<str>>(answers: &[S]) -> String {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for answer in answers.iter().map(AsRef::as_ref).filter(|a| !a.is_empty()) {
        match tally.iter_mut().find(|(seen, _)| *seen == answer) {
            Some((_, count)) => *count += 1,
            None => tally.push((answer, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (answer, count) in tally {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((answer, count));
        }
    }
    best.map(|(a, _)| a.to_string()).unwrap_or_default()
}
