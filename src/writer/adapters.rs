//! Data adapters: the pull interface writers use to walk a document.
//!
//! Small traits are combined by composition. An element that carries metadata
//! implements [`AnnotatedDataAdapter`]; an element that owns a list of children
//! exposes that list as an [`ObjectListDataAdapter`].

use std::marker::PhantomData;

use crate::error::{WriteError, WriteResult};
use crate::events::{
    EdgeEvent, LabeledIdEvent, LinkedLabeledIdEvent, TokenSetDefinitionEvent,
};
use crate::writer::EventReceiver;

/// An element with attached metadata.
pub trait AnnotatedDataAdapter {
    /// Writes the metadata of the element as events into `receiver`.
    fn write_metadata(&self, receiver: &mut dyn EventReceiver) -> WriteResult<()> {
        let _ = receiver;
        Ok(())
    }
}

/// A list of child objects addressed by ID. `E` is the START event type of the
/// objects.
pub trait ObjectListDataAdapter<E> {
    fn count(&self) -> u64;

    fn id_iterator(&self) -> Box<dyn Iterator<Item = String> + '_>;

    /// START event of the object. Unknown IDs fail with
    /// [`WriteError::InvalidArgument`].
    fn object_start_event(&self, id: &str) -> WriteResult<E>;

    /// Writes the events between START and END of the object into `receiver`.
    fn write_content_data(&self, receiver: &mut dyn EventReceiver, id: &str) -> WriteResult<()>;
}

pub trait OtuListDataAdapter: AnnotatedDataAdapter {
    fn list_start_event(&self) -> LabeledIdEvent;

    fn otus(&self) -> &dyn ObjectListDataAdapter<LabeledIdEvent>;
}

pub trait MatrixDataAdapter: AnnotatedDataAdapter {
    fn start_event(&self) -> LinkedLabeledIdEvent;

    /// Number of columns, if all sequences are known to have the same length.
    fn column_count(&self) -> Option<u64>;

    /// Returns `true` if any token is longer than one character.
    fn contains_long_tokens(&self) -> bool;

    fn sequences(&self) -> &dyn ObjectListDataAdapter<LinkedLabeledIdEvent>;

    fn character_sets(&self) -> &dyn ObjectListDataAdapter<LabeledIdEvent>;

    fn token_sets(&self) -> &dyn ObjectListDataAdapter<TokenSetDefinitionEvent>;
}

pub trait TreeNetworkDataAdapter: AnnotatedDataAdapter {
    fn start_event(&self) -> LabeledIdEvent;

    /// `false` for networks, where nodes may have several parents.
    fn is_tree(&self) -> bool;

    fn nodes(&self) -> &dyn ObjectListDataAdapter<LinkedLabeledIdEvent>;

    fn edges(&self) -> &dyn ObjectListDataAdapter<EdgeEvent>;
}

pub trait TreeNetworkGroupDataAdapter: AnnotatedDataAdapter {
    fn start_event(&self) -> LinkedLabeledIdEvent;

    fn trees_and_networks(&self) -> Box<dyn Iterator<Item = &dyn TreeNetworkDataAdapter> + '_>;
}

/// Root adapter handed to a writer.
pub trait DocumentDataAdapter: AnnotatedDataAdapter {
    fn otu_lists(&self) -> Box<dyn Iterator<Item = &dyn OtuListDataAdapter> + '_>;

    fn otu_list_count(&self) -> usize;

    fn matrices(&self) -> Box<dyn Iterator<Item = &dyn MatrixDataAdapter> + '_>;

    fn tree_network_groups(&self) -> Box<dyn Iterator<Item = &dyn TreeNetworkGroupDataAdapter> + '_>;

    /// OTU list with the given ID.
    fn otu_list(&self, id: &str) -> WriteResult<&dyn OtuListDataAdapter> {
        self.otu_lists()
            .find(|list| list.list_start_event().id == id)
            .ok_or_else(|| WriteError::InvalidArgument(format!("No OTU list with the ID \"{}\"", id)))
    }
}

/// An object list without objects.
#[derive(Debug)]
pub struct EmptyObjectListDataAdapter<E> {
    marker: PhantomData<fn() -> E>,
}

impl<E> EmptyObjectListDataAdapter<E> {
    pub fn new() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<E> Default for EmptyObjectListDataAdapter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ObjectListDataAdapter<E> for EmptyObjectListDataAdapter<E> {
    fn count(&self) -> u64 {
        0
    }

    fn id_iterator(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(std::iter::empty())
    }

    fn object_start_event(&self, id: &str) -> WriteResult<E> {
        Err(WriteError::InvalidArgument(format!(
            "This list contains no object with the ID \"{}\"",
            id
        )))
    }

    fn write_content_data(&self, _receiver: &mut dyn EventReceiver, id: &str) -> WriteResult<()> {
        Err(WriteError::InvalidArgument(format!(
            "This list contains no object with the ID \"{}\"",
            id
        )))
    }
}

/// Label to write for an object: its own label, else the label of its linked OTU,
/// else its ID.
pub fn object_label(
    document: &dyn DocumentDataAdapter,
    id: &str,
    label: Option<&str>,
    linked_otu_id: Option<&str>,
) -> String {
    if let Some(label) = label {
        return label.to_string();
    }
    if let Some(otu_id) = linked_otu_id {
        for list in document.otu_lists() {
            if let Ok(otu) = list.otus().object_start_event(otu_id) {
                if let Some(label) = otu.label {
                    return label;
                }
            }
        }
    }
    id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_has_no_ids() {
        let list = EmptyObjectListDataAdapter::<LabeledIdEvent>::new();
        assert_eq!(list.count(), 0);
        assert!(list.id_iterator().next().is_none());
        assert!(matches!(
            list.object_start_event("otu0"),
            Err(WriteError::InvalidArgument(_))
        ));
    }
}
