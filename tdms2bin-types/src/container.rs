use crate::{Channel, Properties};

/// Именованная группа каналов.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub name: String,
    pub properties: Properties,
    pub channels: Vec<Channel>,
}

/// Иерархический контейнер измерений: упорядоченные группы и свойства
/// верхнего уровня.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    pub properties: Properties,
    pub groups: Vec<Group>,
}

impl Group {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            properties: Properties::new(),
            channels: Vec::new(),
        }
    }

    /// Добавляет канал в конец группы.
    pub fn with_channel(
        mut self,
        channel: Channel,
    ) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel(
        &self,
        name: &str,
    ) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Канал по имени; создаётся в конце группы, если его ещё нет.
    pub fn channel_or_insert(
        &mut self,
        name: &str,
    ) -> &mut Channel {
        let idx = match self.channels.iter().position(|c| c.name == name) {
            Some(i) => i,
            None => {
                self.channels.push(Channel::new(name));
                self.channels.len() - 1
            }
        };

        &mut self.channels[idx]
    }
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавляет группу в конец контейнера.
    pub fn with_group(
        mut self,
        group: Group,
    ) -> Self {
        self.groups.push(group);
        self
    }

    pub fn group(
        &self,
        name: &str,
    ) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn group_mut(
        &mut self,
        name: &str,
    ) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.name == name)
    }

    /// Группа по имени; создаётся в конце контейнера, если её ещё нет.
    pub fn group_or_insert(
        &mut self,
        name: &str,
    ) -> &mut Group {
        let idx = match self.groups.iter().position(|g| g.name == name) {
            Some(i) => i,
            None => {
                self.groups.push(Group::new(name));
                self.groups.len() - 1
            }
        };

        &mut self.groups[idx]
    }

    /// Имена групп в порядке их появления.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }
}
