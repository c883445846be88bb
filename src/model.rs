use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub username: String,
    /// bcrypt hash; `None` for accounts created through Google.
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub series: Vec<Series>,
    pub movies: Vec<Movie>,
}

impl User {
    pub fn local(username: String, password_hash: String) -> Self {
        User {
            username,
            password_hash: Some(password_hash),
            google_id: None,
            series: Vec::new(),
            movies: Vec::new(),
        }
    }

    pub fn google(username: String, google_id: String) -> Self {
        User {
            username,
            password_hash: None,
            google_id: Some(google_id),
            series: Vec::new(),
            movies: Vec::new(),
        }
    }

    pub fn push(&mut self, record: MediaRecord) {
        match record {
            MediaRecord::Series(series) => self.series.push(series),
            MediaRecord::Movie(movie) => self.movies.push(movie),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Series {
    pub title: String,
    pub year: String,
    pub rating: String,
    pub genre: String,
    pub total_seasons: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Movie {
    pub title: String,
    pub year: String,
    pub rating: String,
    pub genre: String,
    pub director: String,
    pub runtime: String,
}

/// A looked-up title, ready to be appended to the matching list.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaRecord {
    Series(Series),
    Movie(Movie),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Series,
    Movie,
}

impl MediaKind {
    /// The `Type` discriminator OMDb reports for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Series => "series",
            MediaKind::Movie => "movie",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
