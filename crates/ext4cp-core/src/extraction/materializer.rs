//! Per-entry host actions.

use std::fs;
use std::fs::File;
use std::io;
use std::io::Read;
use std::path::MAIN_SEPARATOR_STR;
use std::path::Path;
use std::path::PathBuf;

use super::naming::apply_filename_workaround;
use super::naming::destination_path;
use super::naming::unique_path;
use crate::DestDir;
use crate::EntryKind;
use crate::ExtractConfig;
use crate::ExtractionObserver;
use crate::ExtractionReport;
use crate::LogicalPath;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;
use crate::volume::Volume;
use crate::volume::is_dot_or_dotdot;

/// Performs the host-side action for one entry at a time.
///
/// Holds the copy buffer shared by every file of the run and accumulates the
/// extraction report. The configuration is only read.
pub struct Materializer<'a> {
    config: &'a ExtractConfig,
    dest: &'a DestDir,
    observer: &'a mut dyn ExtractionObserver,
    buffer: CopyBuffer,
    report: ExtractionReport,
}

impl<'a> Materializer<'a> {
    /// Creates a materializer writing below `dest`.
    pub fn new(
        config: &'a ExtractConfig,
        dest: &'a DestDir,
        observer: &'a mut dyn ExtractionObserver,
    ) -> Self {
        Self {
            config,
            dest,
            observer,
            buffer: CopyBuffer::with_chunk_size(config.chunk_size),
            report: ExtractionReport::new(),
        }
    }

    /// Returns the counters accumulated so far.
    #[must_use]
    pub const fn report(&self) -> &ExtractionReport {
        &self.report
    }

    /// Consumes the materializer and returns its report.
    #[must_use]
    pub fn into_report(self) -> ExtractionReport {
        self.report
    }

    /// Materializes one entry and returns whether the walker should descend
    /// into it.
    ///
    /// `parent` is the entry's containing path relative to the traversal
    /// root; it determines the destination path together with `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be read from the volume or
    /// written to the host.
    pub fn materialize<V: Volume>(
        &mut self,
        volume: &V,
        inode: &V::Inode,
        parent: &LogicalPath,
        name: &str,
        kind: EntryKind,
    ) -> Result<bool> {
        match kind {
            EntryKind::Directory => self.directory(parent, name),
            EntryKind::File => {
                self.file(volume, inode, parent, name)?;
                Ok(false)
            }
            EntryKind::CharDevice
            | EntryKind::BlockDevice
            | EntryKind::Fifo
            | EntryKind::Socket => {
                self.placeholder(parent, name, kind)?;
                Ok(false)
            }
            EntryKind::Symlink => {
                self.symlink(volume, inode, parent, name)?;
                Ok(false)
            }
        }
    }

    fn directory(&mut self, parent: &LogicalPath, name: &str) -> Result<bool> {
        if is_dot_or_dotdot(name) {
            return Ok(false);
        }

        if !self.config.recursive {
            self.report.directories_omitted += 1;
            if self.config.reports_notes() {
                self.observer
                    .on_directory_omitted(&self.config.image_name, parent, name);
            }
            return Ok(false);
        }

        // Flattened output only holds leaves, but they still live below.
        if self.config.flatten {
            return Ok(true);
        }

        self.note_entry(parent, name, EntryKind::Directory);
        let path = destination_path(self.dest, self.config.path_style(), parent, name);
        if !path.is_dir() {
            fs::create_dir(&path)?;
            self.report.directories_created += 1;
        }
        Ok(true)
    }

    fn file<V: Volume>(
        &mut self,
        volume: &V,
        inode: &V::Inode,
        parent: &LogicalPath,
        name: &str,
    ) -> Result<()> {
        self.note_entry(parent, name, EntryKind::File);
        let path = self.claim_path(parent, name);
        let path = apply_filename_workaround(
            path,
            self.config.filename_workaround && cfg!(windows),
        );

        let mut reader = volume.open_read(inode)?;
        let mut output = File::create(&path)?;
        let written = copy_with_buffer(&mut reader, &mut output, &mut self.buffer)?;

        self.report.files_extracted += 1;
        self.report.bytes_written = self.report.bytes_written.saturating_add(written);
        Ok(())
    }

    fn placeholder(&mut self, parent: &LogicalPath, name: &str, kind: EntryKind) -> Result<()> {
        self.note_entry(parent, name, kind);
        let path = self.claim_path(parent, name);
        File::create(&path)?;
        self.report.placeholders_created += 1;
        Ok(())
    }

    fn symlink<V: Volume>(
        &mut self,
        volume: &V,
        inode: &V::Inode,
        parent: &LogicalPath,
        name: &str,
    ) -> Result<()> {
        self.note_entry(parent, name, EntryKind::Symlink);
        let path = self.claim_path(parent, name);

        let mut raw = Vec::new();
        volume.open_read(inode)?.read_to_end(&mut raw)?;
        let target = String::from_utf8(raw)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
            .replace('/', MAIN_SEPARATOR_STR);

        if is_symlink(&path) {
            self.report.symlinks_skipped += 1;
            return Ok(());
        }

        create_symlink(&target, &path)?;
        self.report.symlinks_created += 1;
        Ok(())
    }

    /// Destination for a non-directory entry, renamed when it would clobber
    /// something and renaming is enabled.
    fn claim_path(&mut self, parent: &LogicalPath, name: &str) -> PathBuf {
        let path = destination_path(self.dest, self.config.path_style(), parent, name);
        if !self.config.conflict_rename {
            return path;
        }

        let (path, renamed) = unique_path(&path);
        if renamed {
            self.report.entries_renamed += 1;
        }
        path
    }

    fn note_entry(&mut self, parent: &LogicalPath, name: &str, kind: EntryKind) {
        if self.config.reports_entries() {
            self.observer.on_entry(parent, name, kind);
        }
    }
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

#[allow(unused_variables)]
fn create_symlink(target: &str, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)?;
        Ok(())
    }

    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(target, link)?;
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    {
        Err(crate::ExtractionError::Io(io::Error::new(
            io::ErrorKind::Unsupported,
            "symlinks are not supported on this platform",
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ExtractionError;
    use crate::RecordingObserver;
    use crate::volume::InodeId;
    use crate::volume::MemoryVolume;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        dest: DestDir,
        volume: MemoryVolume,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().expect("failed to create temp dir");
            let dest = DestDir::new(temp.path()).expect("temp dir should be valid");
            Self {
                temp,
                dest,
                volume: MemoryVolume::new(),
            }
        }

        fn run(
            &self,
            config: &ExtractConfig,
            inode: InodeId,
            parent: &LogicalPath,
            name: &str,
            kind: EntryKind,
        ) -> (bool, ExtractionReport, Vec<String>) {
            let mut observer = RecordingObserver::default();
            let mut materializer = Materializer::new(config, &self.dest, &mut observer);
            let descend = materializer
                .materialize(&self.volume, &inode, parent, name, kind)
                .expect("materialize should succeed");
            let report = materializer.into_report();
            (descend, report, observer.lines)
        }
    }

    fn recursive() -> ExtractConfig {
        ExtractConfig {
            recursive: true,
            ..ExtractConfig::new("test.img")
        }
    }

    #[test]
    fn test_file_is_copied() {
        let mut fx = Fixture::new();
        let id = fx.volume.insert_file("hello.txt", b"Hello, ext4!\n").unwrap();

        let (descend, report, _) = fx.run(
            &ExtractConfig::default(),
            id,
            &LogicalPath::root(),
            "hello.txt",
            EntryKind::File,
        );

        assert!(!descend);
        assert_eq!(report.files_extracted, 1);
        assert_eq!(report.bytes_written, 13);
        assert_eq!(
            fs::read(fx.temp.path().join("hello.txt")).unwrap(),
            b"Hello, ext4!\n"
        );
    }

    #[test]
    fn test_file_overwrites_existing() {
        let mut fx = Fixture::new();
        let id = fx.volume.insert_file("a", b"new").unwrap();
        fs::write(fx.temp.path().join("a"), "old contents").unwrap();

        fx.run(&ExtractConfig::default(), id, &LogicalPath::root(), "a", EntryKind::File);
        assert_eq!(fs::read(fx.temp.path().join("a")).unwrap(), b"new");
    }

    #[test]
    fn test_dot_entries_are_ignored() {
        let fx = Fixture::new();
        for name in [".", ".."] {
            let (descend, report, lines) = fx.run(
                &recursive(),
                InodeId::ROOT,
                &LogicalPath::root(),
                name,
                EntryKind::Directory,
            );
            assert!(!descend);
            assert_eq!(report.total_items(), 0);
            assert!(lines.is_empty());
        }
        assert_eq!(fs::read_dir(fx.temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_directory_without_recursion_is_omitted() {
        let mut fx = Fixture::new();
        let id = fx.volume.insert_dir("etc").unwrap();
        let config = ExtractConfig {
            verbosity: 1,
            ..ExtractConfig::new("test.img")
        };

        let (descend, report, lines) =
            fx.run(&config, id, &LogicalPath::root(), "etc", EntryKind::Directory);

        assert!(!descend);
        assert_eq!(report.directories_omitted, 1);
        assert_eq!(
            lines,
            ["test.img: -R not specified; omitting directory '/etc'"]
        );
        assert!(!fx.temp.path().join("etc").exists());
    }

    #[test]
    fn test_directory_omission_is_silent_at_level_zero() {
        let mut fx = Fixture::new();
        let id = fx.volume.insert_dir("etc").unwrap();
        let (_, _, lines) = fx.run(
            &ExtractConfig::default(),
            id,
            &LogicalPath::root(),
            "etc",
            EntryKind::Directory,
        );
        assert!(lines.is_empty());
    }

    #[test]
    fn test_directory_created_when_recursive() {
        let mut fx = Fixture::new();
        let id = fx.volume.insert_dir("etc").unwrap();

        let (descend, report, _) =
            fx.run(&recursive(), id, &LogicalPath::root(), "etc", EntryKind::Directory);
        assert!(descend);
        assert_eq!(report.directories_created, 1);
        assert!(fx.temp.path().join("etc").is_dir());

        let (descend, report, _) =
            fx.run(&recursive(), id, &LogicalPath::root(), "etc", EntryKind::Directory);
        assert!(descend, "existing directories are revisited without error");
        assert_eq!(report.directories_created, 0);
    }

    #[test]
    fn test_flattened_directory_descends_without_creating() {
        let mut fx = Fixture::new();
        let id = fx.volume.insert_dir("etc").unwrap();
        let config = ExtractConfig {
            flatten: true,
            verbosity: 2,
            ..recursive()
        };

        let (descend, report, lines) =
            fx.run(&config, id, &LogicalPath::root(), "etc", EntryKind::Directory);
        assert!(descend);
        assert_eq!(report.directories_created, 0);
        assert!(lines.is_empty());
        assert_eq!(fs::read_dir(fx.temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_special_nodes_become_empty_files() {
        let mut fx = Fixture::new();
        for (name, kind) in [
            ("null", EntryKind::CharDevice),
            ("sda", EntryKind::BlockDevice),
            ("pipe", EntryKind::Fifo),
            ("sock", EntryKind::Socket),
        ] {
            let id = fx.volume.insert_special(name, kind).unwrap();
            let (descend, report, _) =
                fx.run(&ExtractConfig::default(), id, &LogicalPath::root(), name, kind);
            assert!(!descend);
            assert_eq!(report.placeholders_created, 1);

            let meta = fs::symlink_metadata(fx.temp.path().join(name)).unwrap();
            assert!(meta.is_file(), "{name} should be a regular file");
            assert_eq!(meta.len(), 0);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_created_then_skipped() {
        let mut fx = Fixture::new();
        let id = fx.volume.insert_symlink("link", "etc/passwd").unwrap();

        let (_, report, _) = fx.run(
            &ExtractConfig::default(),
            id,
            &LogicalPath::root(),
            "link",
            EntryKind::Symlink,
        );
        assert_eq!(report.symlinks_created, 1);
        let link = fx.temp.path().join("link");
        assert_eq!(fs::read_link(&link).unwrap(), Path::new("etc/passwd"));

        let (_, report, _) = fx.run(
            &ExtractConfig::default(),
            id,
            &LogicalPath::root(),
            "link",
            EntryKind::Symlink,
        );
        assert_eq!(report.symlinks_created, 0);
        assert_eq!(report.symlinks_skipped, 1);
    }

    #[test]
    fn test_symlink_with_invalid_utf8_target_fails() {
        struct BadLinkVolume(MemoryVolume);

        impl Volume for BadLinkVolume {
            type Inode = InodeId;

            fn info(&self) -> crate::volume::VolumeInfo {
                self.0.info()
            }

            fn root(&self) -> Result<InodeId> {
                self.0.root()
            }

            fn get_inode(&self, id: InodeId) -> Result<InodeId> {
                self.0.get_inode(id)
            }

            fn open_dir(&self, inode: &InodeId) -> Result<Vec<crate::volume::DirEntry>> {
                self.0.open_dir(inode)
            }

            fn open_read<'a>(&'a self, _inode: &InodeId) -> Result<Box<dyn Read + 'a>> {
                Ok(Box::new(io::Cursor::new(vec![0xff, 0xfe])))
            }
        }

        let fx = Fixture::new();
        let volume = BadLinkVolume(MemoryVolume::new());
        let config = ExtractConfig::default();
        let mut observer = crate::NoopObserver;
        let mut materializer = Materializer::new(&config, &fx.dest, &mut observer);

        let err = materializer
            .materialize(
                &volume,
                &InodeId::ROOT,
                &LogicalPath::root(),
                "bad",
                EntryKind::Symlink,
            )
            .unwrap_err();
        match err {
            ExtractionError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
            other => panic!("expected InvalidData, got {other:?}"),
        }
    }

    #[test]
    fn test_conflict_rename_keeps_existing_file() {
        let mut fx = Fixture::new();
        let id = fx.volume.insert_file("passwd", b"image").unwrap();
        fs::write(fx.temp.path().join("passwd"), "host").unwrap();

        let config = ExtractConfig {
            conflict_rename: true,
            ..ExtractConfig::default()
        };
        let (_, report, _) =
            fx.run(&config, id, &LogicalPath::root(), "passwd", EntryKind::File);

        assert_eq!(report.entries_renamed, 1);
        assert_eq!(fs::read(fx.temp.path().join("passwd")).unwrap(), b"host");
        assert_eq!(fs::read(fx.temp.path().join("passwd_1")).unwrap(), b"image");
    }

    #[test]
    fn test_verbose_entry_lines() {
        let mut fx = Fixture::new();
        fx.volume.insert_dir("etc").unwrap();
        let id = fx.volume.insert_file("etc/passwd", b"x").unwrap();
        fs::create_dir(fx.temp.path().join("etc")).unwrap();

        let config = ExtractConfig {
            verbosity: 2,
            ..ExtractConfig::default()
        };
        let (_, _, lines) = fx.run(
            &config,
            id,
            &LogicalPath::root().join("etc"),
            "passwd",
            EntryKind::File,
        );
        assert_eq!(lines, ["etc/passwd"]);
    }
}
