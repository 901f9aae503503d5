//! Numbered one-shot pickers.  Each prints a list, reads an index and hands
//! back the chosen position; anything that is not a valid index aborts.

use tracing::warn;
use tunebar_proto::model::{Artist, SearchSong, Station};
use tunebar_proto::service::RadioService;

use crate::term::Term;

async fn pick(term: &mut Term, rows: Vec<String>, prompt: &str) -> Option<usize> {
    let len = rows.len();
    for (i, row) in rows.into_iter().enumerate() {
        term.msg(&format!("{:2}) {}\n", i, row));
    }
    term.read_index(prompt).await.filter(|&i| i < len)
}

pub async fn select_station(term: &mut Term, stations: &[Station], prompt: &str) -> Option<usize> {
    let rows = stations
        .iter()
        .map(|s| {
            let mix = if s.use_quickmix { " (QuickMix)" } else { "" };
            format!("{}{}", s.name, mix)
        })
        .collect();
    pick(term, rows, prompt).await
}

pub async fn select_song(term: &mut Term, songs: &[SearchSong]) -> Option<usize> {
    let rows = songs
        .iter()
        .map(|s| format!("{} - {}", s.artist, s.title))
        .collect();
    pick(term, rows, "Select song: ").await
}

pub async fn select_artist(term: &mut Term, artists: &[Artist]) -> Option<usize> {
    let rows = artists.iter().map(|a| a.name.clone()).collect();
    pick(term, rows, "Select artist: ").await
}

/// Plain name list without a prompt text, used for genre browsing.
pub async fn select_name<'a>(
    term: &mut Term,
    names: impl Iterator<Item = &'a str>,
) -> Option<usize> {
    let rows = names.map(str::to_string).collect();
    pick(term, rows, "").await
}

/// Ask for a search phrase and let the user narrow the hits down to one
/// music id.  Declining the artist or track list after the `[a]rtist or
/// [t]rack` question returns `None` silently; every other way out says why.
pub async fn select_music_id(term: &mut Term, service: &dyn RadioService) -> Option<String> {
    let query = term
        .read_line("Search for artist/title: ", true)
        .await
        .filter(|q| !q.is_empty());
    let Some(query) = query else {
        term.msg("Aborted.\n");
        return None;
    };

    term.msg("Searching... ");
    let result = match service.search_music(&query).await {
        Ok(result) => result,
        Err(e) => {
            warn!("search for {:?} failed: {}", query, e);
            term.msg("Error.\n");
            return None;
        }
    };
    term.msg("\r");

    match (result.artists.is_empty(), result.songs.is_empty()) {
        (false, false) => {
            term.msg("Is this an [a]rtist or [t]rack name? Press c to abort.\n");
            match term.read_key().await {
                Some('a') => select_artist(term, &result.artists)
                    .await
                    .map(|i| result.artists[i].music_id.clone()),
                Some('t') => select_song(term, &result.songs)
                    .await
                    .map(|i| result.songs[i].music_id.clone()),
                _ => {
                    term.msg("Aborted.\n");
                    None
                }
            }
        }
        (true, false) => {
            let chosen = select_song(term, &result.songs).await;
            aborted_unless(term, chosen.map(|i| result.songs[i].music_id.clone()))
        }
        (false, true) => {
            let chosen = select_artist(term, &result.artists).await;
            aborted_unless(term, chosen.map(|i| result.artists[i].music_id.clone()))
        }
        (true, true) => {
            term.msg("Nothing found...\n");
            None
        }
    }
}

fn aborted_unless(term: &mut Term, chosen: Option<String>) -> Option<String> {
    if chosen.is_none() {
        term.msg("Aborted.\n");
    }
    chosen
}
