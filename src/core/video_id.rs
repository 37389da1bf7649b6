/// Video ids on the platform are 11 characters; anything much longer is
/// not an id.
const MAX_ID_LEN: usize = 64;

const URL_MARKERS: [&str; 4] = ["v=", "youtu.be/", "/shorts/", "/embed/"];

/// Pulls the video id out of a watch, `youtu.be`, `shorts/` or `embed/`
/// URL, or accepts a bare id. Returns `None` when nothing id-shaped is left.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    let candidate = URL_MARKERS
        .iter()
        .find_map(|marker| input.split_once(marker).map(|(_, rest)| rest))
        .map(|rest| rest.split(['&', '?', '/', '#']).next().unwrap_or(rest))
        .unwrap_or(input);

    is_video_id(candidate).then(|| candidate.to_string())
}

fn is_video_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= MAX_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
