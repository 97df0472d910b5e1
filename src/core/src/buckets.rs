//! Allow/deny partitioning of a snapshot, including the incremental
//! single-toggle update that mirrors how the legacy preference screen moved
//! entries between category headers.

use crate::model::Snapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bucket {
    Allow,
    Deny,
}

/// A visible bucket: hidden (empty) buckets are simply absent.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub bucket: Bucket,
    pub keys: Vec<String>,
}

/// The presented partition, a pure projection of the snapshot's allow-states.
/// It is never persisted, and the incremental path below must stay observably
/// identical to recomputing it from scratch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Partition {
    sections: Vec<Section>,
}

impl Partition {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let allow: Vec<String> = snapshot
            .iter()
            .filter(|app| app.allowed)
            .map(|app| app.key().to_owned())
            .collect();
        let deny: Vec<String> = snapshot
            .iter()
            .filter(|app| !app.allowed)
            .map(|app| app.key().to_owned())
            .collect();

        let mut sections = Vec::new();
        if !allow.is_empty() {
            sections.push(Section {
                bucket: Bucket::Allow,
                keys: allow,
            });
        }
        if !deny.is_empty() {
            sections.push(Section {
                bucket: Bucket::Deny,
                keys: deny,
            });
        }

        Self { sections }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn count(&self, bucket: Bucket) -> usize {
        self.section_pos(bucket)
            .map_or(0, |i| self.sections[i].keys.len())
    }

    fn section_pos(&self, bucket: Bucket) -> Option<usize> {
        self.sections.iter().position(|s| s.bucket == bucket)
    }

    /// Apply a single (key, new allow-state) transition:
    /// 1. move the entry between buckets;
    /// 2. an emptied source bucket disappears;
    /// 3. a destination bucket gaining its first entry reappears, and when
    ///    that destination is "allow", the deny bucket is re-appended after
    ///    it so the presentation order stays allow-then-deny;
    /// 4. an already-visible destination only gains the one entry, at its
    ///    snapshot-order position.
    pub fn apply_toggle(&mut self, snapshot: &Snapshot, key: &str, allow: bool) {
        let (source, dest) = if allow {
            (Bucket::Deny, Bucket::Allow)
        } else {
            (Bucket::Allow, Bucket::Deny)
        };

        if let Some(i) = self.section_pos(source) {
            self.sections[i].keys.retain(|k| k != key);
            if self.sections[i].keys.is_empty() {
                self.sections.remove(i);
            }
        }

        match self.section_pos(dest) {
            Some(i) => {
                let section = &mut self.sections[i];
                let rank = snapshot.rank(key);
                let at = section
                    .keys
                    .iter()
                    .take_while(|k| snapshot.rank(k.as_str()) < rank)
                    .count();
                section.keys.insert(at, key.to_owned());
            }
            None => {
                self.sections.push(Section {
                    bucket: dest,
                    keys: vec![key.to_owned()],
                });
                if dest == Bucket::Allow
                    && let Some(i) = self.section_pos(Bucket::Deny)
                {
                    let deny = self.sections.remove(i);
                    self.sections.push(deny);
                }
            }
        }
    }
}
