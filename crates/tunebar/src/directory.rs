use tunebar_proto::model::{find_station, GenreCategory, Station};

/// The listener's stations plus the genre catalogue, once it has been fetched.
#[derive(Debug, Default)]
pub struct Directory {
    pub stations: Vec<Station>,
    pub genres: Option<Vec<GenreCategory>>,
}

impl Directory {
    pub fn new(stations: Vec<Station>) -> Self {
        Self {
            stations,
            genres: None,
        }
    }

    pub fn find(&self, id: &str) -> Option<&Station> {
        find_station(&self.stations, id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Station> {
        self.stations.iter_mut().find(|s| s.id == id)
    }

    pub fn toggle_quickmix(&mut self, index: usize) -> Option<bool> {
        let station = self.stations.get_mut(index)?;
        station.use_quickmix = !station.use_quickmix;
        Some(station.use_quickmix)
    }
}
